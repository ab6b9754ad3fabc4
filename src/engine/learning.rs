// ==========================================
// 班组管理系统 - 学习能力评分引擎
// ==========================================
// 动态水位: 关注线 / 熔断线随班组均值浮动
// 区域判定: SAFE / DANGER / CRITICAL
// 趋势系数: 与上月违规数比较
// ==========================================

use crate::config::algorithm::LearningConfig;
use crate::domain::types::StatusColor;
use crate::engine::round_to;
use serde::Serialize;
use std::cmp::Ordering;

const SAFE_BASE: f64 = 95.0;
const DANGER_BASE: f64 = 60.0;
/// 优于班组均值的校准补偿
const GROUP_BONUS: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskZone {
    Safe,
    Danger,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendType {
    Meltdown,
    ColdStartWarning,
    HighImprovement,
    Solidification,
    Deterioration,
    Improvement,
    SafeStable,
    SafeFluctuation,
    ColdStartGood,
}

/// 单月学习能力结果
#[derive(Debug, Clone, Serialize)]
pub struct LearningScore {
    pub score: f64,
    pub zone: RiskZone,
    pub count: u32,
    pub trend_type: TrendType,
    pub status_color: StatusColor,
    pub alert_tag: String,
    pub warning_line: f64,
    pub critical_line: f64,
}

pub struct LearningEngine<'a> {
    config: &'a LearningConfig,
}

impl<'a> LearningEngine<'a> {
    pub fn new(config: &'a LearningConfig) -> Self {
        Self { config }
    }

    /// (关注线, 熔断线)
    pub fn water_lines(&self, group_avg: f64) -> (f64, f64) {
        let cfg = self.config;
        let mut warning = (group_avg * cfg.trend_warning_ratio)
            .max(cfg.trend_warning_floor)
            .max(cfg.historical_baseline);
        if cfg.trend_ceiling_floor > 0.0 {
            warning = warning.min(cfg.trend_ceiling_floor);
        }
        let critical = (group_avg * cfg.trend_critical_ratio)
            .max(cfg.trend_critical_floor)
            .max(warning + 1.0);
        (warning, critical)
    }

    /// 单月风险状态判定
    ///
    /// # 参数
    /// - `current`: 本月违规数
    /// - `previous`: 上月违规数（None 表示无历史）
    /// - `group_avg`: 班组人均违规数
    pub fn ability(&self, current: u32, previous: Option<u32>, group_avg: f64) -> LearningScore {
        let cfg = self.config;
        let (warning_line, critical_line) = self.water_lines(group_avg);
        let curr = current as f64;

        if curr >= critical_line {
            return LearningScore {
                score: 0.0,
                zone: RiskZone::Critical,
                count: current,
                trend_type: TrendType::Meltdown,
                status_color: StatusColor::Red,
                alert_tag: format!("⛔ 触达熔断线 ({}≥{:.0})", current, critical_line),
                warning_line: round_to(warning_line, 1),
                critical_line: round_to(critical_line, 1),
            };
        }

        let trend = previous.map(|p| current.cmp(&p));
        let (zone, base, coeff, trend_type, color, tag) = if curr >= warning_line {
            match trend {
                None => (
                    RiskZone::Danger,
                    DANGER_BASE,
                    cfg.factor_warning,
                    TrendType::ColdStartWarning,
                    StatusColor::Yellow,
                    "⚠️ 起步高危",
                ),
                Some(Ordering::Less) => (
                    RiskZone::Danger,
                    DANGER_BASE,
                    cfg.factor_mitigation,
                    TrendType::HighImprovement,
                    StatusColor::Yellow,
                    "⚠️ 高位改善 (未脱险)",
                ),
                Some(Ordering::Equal) => (
                    RiskZone::Danger,
                    DANGER_BASE,
                    cfg.factor_solidification,
                    TrendType::Solidification,
                    StatusColor::Orange,
                    "⛔ 风险固化",
                ),
                Some(Ordering::Greater) => (
                    RiskZone::Danger,
                    DANGER_BASE,
                    cfg.factor_deterioration,
                    TrendType::Deterioration,
                    StatusColor::Red,
                    "🔴 高位恶化",
                ),
            }
        } else {
            match trend {
                None => (
                    RiskZone::Safe,
                    SAFE_BASE,
                    cfg.factor_stable,
                    TrendType::ColdStartGood,
                    StatusColor::Green,
                    "✅ 表现良好",
                ),
                Some(Ordering::Less) => (
                    RiskZone::Safe,
                    SAFE_BASE,
                    cfg.factor_reward,
                    TrendType::Improvement,
                    StatusColor::Green,
                    "📈 持续改善",
                ),
                Some(Ordering::Equal) => (
                    RiskZone::Safe,
                    SAFE_BASE,
                    cfg.factor_stable,
                    TrendType::SafeStable,
                    StatusColor::Green,
                    "✅ 保持平稳",
                ),
                Some(Ordering::Greater) => (
                    RiskZone::Safe,
                    SAFE_BASE,
                    cfg.factor_safe_fluctuation,
                    TrendType::SafeFluctuation,
                    StatusColor::Blue,
                    "📉 安全波动",
                ),
            }
        };

        let mut score = base * coeff;
        if curr < group_avg {
            score *= GROUP_BONUS;
        }

        LearningScore {
            score: round_to(score.clamp(0.0, 100.0), 1),
            zone,
            count: current,
            trend_type,
            status_color: color,
            alert_tag: tag.to_string(),
            warning_line: round_to(warning_line, 1),
            critical_line: round_to(critical_line, 1),
        }
    }

    /// 长周期学习能力: 逐月判定后按时间加权平均（越近权重越大）
    ///
    /// # 参数
    /// - `monthly_counts`: 周期内各月违规数（按时间顺序）
    /// - `pre_period_count`: 周期前一月违规数
    /// - `group_avg`: 周期内班组人均月违规数
    pub fn period(&self, monthly_counts: &[u32], pre_period_count: Option<u32>, group_avg: f64) -> f64 {
        let mut previous = pre_period_count;
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        for (i, &count) in monthly_counts.iter().enumerate() {
            let score = self.ability(count, previous, group_avg).score;
            let weight = 1.0 + i as f64 * self.config.time_decay_rate;
            weighted_sum += score * weight;
            total_weight += weight;
            previous = Some(count);
        }
        if total_weight > 0.0 {
            round_to(weighted_sum / total_weight, 1)
        } else {
            0.0
        }
    }
}
