// ==========================================
// 班组管理系统 - 稳定度评分引擎（波动型）
// ==========================================
// 职责: 以月度安全分序列的波动程度衡量稳定度
// 规则:
// - 0 违规月仅在近12月均值 < 1 或处于连续 ≥3 个月的 0 违规段时计入
// - 波动指标线性映射为分数并截断到 [floor, ceiling]
// ==========================================

use crate::config::algorithm::{AlgorithmConfig, StabilityConfig, VolatilityMetric};
use crate::domain::types::StatusColor;
use crate::engine::month::{month_range, YearMonth};
use crate::engine::round_to;
use crate::engine::safety::SafetyEngine;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// 连续 0 违规视为有效的最短月数
const ZERO_STREAK_MIN: usize = 3;
/// 近12个月
const RECENT_MONTHS: i32 = 12;
const NO_DATA_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    Ok,
    Low,
}

/// 稳定度结果
#[derive(Debug, Clone, Serialize)]
pub struct StabilityScore {
    pub stability_score: f64,
    pub stability_label: String,
    pub status_color: StatusColor,
    pub alert_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility_metric: Option<VolatilityMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility_metric_label: Option<String>,
    pub volatility_value: f64,
    pub coverage: String,
    pub confidence: Confidence,
    pub low_level_tip: Option<String>,
    pub sample_tip: Option<String>,
    pub safety_cv: Option<f64>,
    pub mean_safety: Option<f64>,
}

impl StabilityScore {
    fn no_data() -> Self {
        Self {
            stability_score: NO_DATA_SCORE,
            stability_label: "暂无数据".to_string(),
            status_color: StatusColor::Gray,
            alert_tag: "暂无数据".to_string(),
            volatility_metric: None,
            volatility_metric_label: None,
            volatility_value: 0.0,
            coverage: "0/0".to_string(),
            confidence: Confidence::Low,
            low_level_tip: None,
            sample_tip: None,
            safety_cv: None,
            mean_safety: None,
        }
    }
}

/// 稳定度计算输入
#[derive(Debug, Clone, Default)]
pub struct StabilityInput {
    /// 窗口内月份
    pub window: Vec<YearMonth>,
    /// 月度安全分
    pub monthly_scores: BTreeMap<YearMonth, f64>,
    /// 月度违规数
    pub monthly_issue_counts: BTreeMap<YearMonth, usize>,
    /// 近12个月各月违规数
    pub issue_counts_last_12: Vec<usize>,
    /// 安全维度雷达分（低水平提示依据）
    pub safety_score_for_tip: Option<f64>,
}

pub struct StabilityEngine<'a> {
    config: &'a StabilityConfig,
    algorithm: &'a AlgorithmConfig,
}

impl<'a> StabilityEngine<'a> {
    pub fn new(algorithm: &'a AlgorithmConfig) -> Self {
        Self {
            config: &algorithm.stability_new,
            algorithm,
        }
    }

    /// 解析稳定度窗口
    ///
    /// 结束月默认当前月；起点为结束月向前 window_months-1 个月，
    /// 起始月更晚时取起始月；跨度不足 min_effective_months 时向前补足
    pub fn resolve_window(
        &self,
        start: Option<YearMonth>,
        end: Option<YearMonth>,
        today: YearMonth,
    ) -> (YearMonth, YearMonth) {
        let end = end.unwrap_or(today);
        let mut window_start = end.shift(-(self.config.window_months as i32 - 1));
        if let Some(start) = start {
            if start > window_start {
                window_start = start;
            }
        }
        let span = end.months_since(&window_start) + 1;
        if span < self.config.min_effective_months as i32 {
            window_start = end.shift(-(self.config.min_effective_months as i32 - 1));
        }
        (window_start, end)
    }

    /// 违规明细查询起点: 窗口起点与近12月起点中较早者
    pub fn query_start(&self, window_start: YearMonth, window_end: YearMonth) -> YearMonth {
        window_start.min(window_end.shift(-(RECENT_MONTHS - 1)))
    }

    /// 由按月分组的违规扣分构建输入并评分
    pub fn evaluate(
        &self,
        window_start: YearMonth,
        window_end: YearMonth,
        violations_by_month: &BTreeMap<YearMonth, Vec<f64>>,
        safety_score_for_tip: Option<f64>,
    ) -> StabilityScore {
        let safety = SafetyEngine::new(&self.algorithm.safety);
        let window = month_range(window_start, window_end);
        let empty: Vec<f64> = Vec::new();

        let mut input = StabilityInput {
            safety_score_for_tip,
            ..Default::default()
        };
        for m in &window {
            let violations = violations_by_month.get(m).unwrap_or(&empty);
            input.monthly_issue_counts.insert(*m, violations.len());
            input
                .monthly_scores
                .insert(*m, safety.dual_track(violations, 1).final_score);
        }
        input.issue_counts_last_12 = month_range(window_end.shift(-(RECENT_MONTHS - 1)), window_end)
            .iter()
            .map(|m| violations_by_month.get(m).map_or(0, Vec::len))
            .collect();
        input.window = window;

        self.score(&input)
    }

    /// 稳定度评分
    pub fn score(&self, input: &StabilityInput) -> StabilityScore {
        if input.window.is_empty() {
            return StabilityScore::no_data();
        }
        let cfg = self.config;

        let avg_issues_12 = if input.issue_counts_last_12.is_empty() {
            0.0
        } else {
            input.issue_counts_last_12.iter().sum::<usize>() as f64
                / input.issue_counts_last_12.len() as f64
        };

        let issues = |m: &YearMonth| input.monthly_issue_counts.get(m).copied().unwrap_or(0);

        // 连续 0 违规段
        let mut zero_streak: HashSet<YearMonth> = HashSet::new();
        let mut current: Vec<YearMonth> = Vec::new();
        for m in &input.window {
            if issues(m) == 0 {
                current.push(*m);
            } else {
                if current.len() >= ZERO_STREAK_MIN {
                    zero_streak.extend(current.iter().copied());
                }
                current.clear();
            }
        }
        if current.len() >= ZERO_STREAK_MIN {
            zero_streak.extend(current.iter().copied());
        }

        let effective: Vec<f64> = input
            .window
            .iter()
            .filter(|m| issues(m) != 0 || avg_issues_12 < 1.0 || zero_streak.contains(m))
            .map(|m| input.monthly_scores.get(m).copied().unwrap_or(100.0))
            .collect();

        let window_count = input.window.len();
        let effective_count = effective.len();

        let metric_value = match cfg.volatility_metric {
            VolatilityMetric::MeanAbsDelta => mean_abs_delta(&effective),
            VolatilityMetric::Mad => {
                if effective.is_empty() {
                    0.0
                } else {
                    let med = median(&effective);
                    let deviations: Vec<f64> = effective.iter().map(|s| (s - med).abs()).collect();
                    median(&deviations)
                }
            }
            VolatilityMetric::Cv => coefficient_of_variation(&effective).unwrap_or(0.0),
        };

        let raw_score = if cfg.score_map_high == cfg.score_map_low {
            (cfg.score_map_low_score + cfg.score_map_high_score) / 2.0
        } else {
            let slope = (cfg.score_map_high_score - cfg.score_map_low_score)
                / (cfg.score_map_high - cfg.score_map_low);
            cfg.score_map_low_score + slope * (metric_value - cfg.score_map_low)
        };
        let stability_score = raw_score.min(cfg.score_ceiling).max(cfg.score_floor);

        let (label, color, tag) = if stability_score >= cfg.label_cutoffs.stable {
            ("稳定", StatusColor::Green, "✅ 稳定")
        } else if stability_score >= cfg.label_cutoffs.medium {
            ("波动偏大", StatusColor::Orange, "⚠️ 波动偏大")
        } else {
            ("波动较大", StatusColor::Red, "⛔ 波动较大")
        };

        let mean_safety = mean(&effective);
        let safety_cv = if effective_count >= 2 {
            coefficient_of_variation(&effective).unwrap_or(0.0)
        } else {
            0.0
        };

        let low_level_threshold = cfg
            .low_level_threshold
            .unwrap_or(self.algorithm.safety.thresholds.fail_score);
        let tip_basis = input.safety_score_for_tip.or(mean_safety);
        let low_level_tip = tip_basis
            .filter(|basis| *basis <= low_level_threshold)
            .map(|_| "整体安全水平偏低（即使稳定，仍需关注）".to_string());

        let insufficient = effective_count < cfg.min_effective_months as usize;

        StabilityScore {
            stability_score: round_to(stability_score, 1),
            stability_label: label.to_string(),
            status_color: color,
            alert_tag: tag.to_string(),
            volatility_metric: Some(cfg.volatility_metric),
            volatility_metric_label: Some(cfg.volatility_metric.label().to_string()),
            volatility_value: round_to(metric_value, 3),
            coverage: format!("{}/{}", effective_count, window_count),
            confidence: if insufficient { Confidence::Low } else { Confidence::Ok },
            low_level_tip,
            sample_tip: insufficient.then(|| "样本不足，稳定度参考价值有限".to_string()),
            safety_cv: mean_safety.map(|_| round_to(safety_cv, 3)),
            mean_safety: mean_safety.map(|m| round_to(m, 2)),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

fn mean_abs_delta(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let diffs: Vec<f64> = values.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    diffs.iter().sum::<f64>() / diffs.len() as f64
}

/// 总体标准差 / 均值；少于 2 个值或均值非正时为 None
fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    if m <= 0.0 {
        return None;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt() / m)
}
