// ==========================================
// 班组管理系统 - 培训能力评分引擎
// ==========================================
// 规则优先级:
// 1. 绝对失格次数熔断
// 2. 小样本期出现失格
// 3. 大样本年化失格频率 (AFR)
// 无记录时按统计周期长短给默认分
// ==========================================

use crate::config::algorithm::TrainingConfig;
use crate::domain::types::{RiskLevel, StatusColor};
use crate::engine::round_to;
use serde::Serialize;
use std::cmp::Ordering;

/// 参与评分的单条培训记录
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingSample {
    pub score: Option<f64>,
    pub is_qualified: bool,
    pub is_disqualified: bool,
}

impl TrainingSample {
    /// 成绩取整；缺失按 0
    fn score_value(&self) -> i64 {
        self.score.map(|s| s.trunc() as i64).unwrap_or(0)
    }

    fn is_failed(&self) -> bool {
        self.is_disqualified || self.score_value() == 0 || !self.is_qualified
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingStatsSummary {
    pub total_ops: usize,
    pub fail_count: u32,
    pub duration_days: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskAlert {
    pub show: bool,
    pub level: RiskLevel,
    pub text: String,
    pub description: String,
}

/// 培训评分结果
#[derive(Debug, Clone, Serialize)]
pub struct TrainingScore {
    pub radar_score: f64,
    pub original_score: f64,
    pub penalty_coefficient: f64,
    pub stats: TrainingStatsSummary,
    pub risk_alert: RiskAlert,
    pub status_color: StatusColor,
    pub alert_tag: String,
}

pub struct TrainingEngine<'a> {
    config: &'a TrainingConfig,
}

impl<'a> TrainingEngine<'a> {
    pub fn new(config: &'a TrainingConfig) -> Self {
        Self { config }
    }

    /// 带惩罚的培训评分
    ///
    /// # 参数
    /// - `records`: 周期内培训记录
    /// - `duration_days`: 统计周期天数（年化用）
    /// - `cert_years`: 取证年限，None 或不足 1 年视为新员工
    pub fn with_penalty(
        &self,
        records: &[TrainingSample],
        duration_days: i64,
        cert_years: Option<f64>,
    ) -> TrainingScore {
        if records.is_empty() {
            return self.without_records(duration_days);
        }

        let total_ops = records.len();
        let fail_count = records.iter().filter(|r| r.is_failed()).count() as u32;
        let total_score: i64 = records.iter().map(TrainingSample::score_value).sum();
        let base_score = total_score as f64 / total_ops as f64;

        let rules = &self.config.penalty_rules;
        let mut duration_days = duration_days;
        let (coefficient, level, text, description) =
            if fail_count >= rules.absolute_threshold.fail_count {
                (
                    rules.absolute_threshold.coefficient,
                    RiskLevel::Critical,
                    "❌ 业务能力差 (高频失格)".to_string(),
                    format!(
                        "检测到绝对失格次数 ≥ {}次（实际{}次），系统判定为不合格。",
                        rules.absolute_threshold.fail_count, fail_count
                    ),
                )
            } else if (total_ops as u32) < rules.small_sample.sample_size && fail_count > 0 {
                (
                    rules.small_sample.coefficient,
                    RiskLevel::HighRisk,
                    "⚠️ 观察期失格 (高风险-需带教)".to_string(),
                    format!(
                        "样本量不足（仅{}次操作），但已出现{}次失格。建议加强带教。",
                        total_ops, fail_count
                    ),
                )
            } else if (total_ops as u32) >= rules.small_sample.sample_size {
                duration_days = duration_days.max(1);
                let afr = fail_count as f64 / duration_days as f64 * 365.0;
                let is_new_employee = cert_years.map_or(true, |y| y < 1.0);

                let mut sorted: Vec<_> = rules
                    .afr_rules_for(is_new_employee)
                    .iter()
                    .filter_map(|r| r.limit().map(|limit| (limit, r)))
                    .collect();
                sorted.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

                match sorted.into_iter().find(|(limit, _)| afr >= *limit) {
                    Some((limit, rule)) => {
                        let (level, default_label) = if rule.coefficient <= 0.5 {
                            (RiskLevel::Critical, "高频失格")
                        } else if rule.coefficient <= 0.8 {
                            (RiskLevel::Warning, "频率偏高")
                        } else {
                            (RiskLevel::Notice, "偶发失格")
                        };
                        let label = rule.label.as_deref().unwrap_or(default_label);
                        (
                            rule.coefficient,
                            level,
                            format!("⚠️ {} (年化 {:.1} 次)", label, afr),
                            format!(
                                "当前周期{}天内失格{}次，年化等效{:.1}次/年，触发{}阈值({})。",
                                duration_days, fail_count, afr, label, limit
                            ),
                        )
                    }
                    None => normal(),
                }
            } else {
                normal()
            };

        TrainingScore {
            radar_score: round_to(base_score * coefficient, 1),
            original_score: round_to(base_score, 1),
            penalty_coefficient: coefficient,
            stats: TrainingStatsSummary {
                total_ops,
                fail_count,
                duration_days,
            },
            risk_alert: RiskAlert {
                show: fail_count > 0,
                level,
                text: text.clone(),
                description,
            },
            status_color: level.color(),
            alert_tag: text,
        }
    }

    fn without_records(&self, duration_days: i64) -> TrainingScore {
        let thresholds = &self.config.duration_thresholds;
        let defaults = &thresholds.default_scores;
        let (score, level, text, description) = if duration_days <= thresholds.short_term_days {
            (
                defaults.short,
                RiskLevel::Normal,
                "未开展培训",
                format!("统计周期{}天内未开展培训，属于正常情况。", duration_days),
            )
        } else if duration_days <= thresholds.mid_term_days {
            (
                defaults.mid,
                RiskLevel::Notice,
                "⚠️ 长期未培训",
                format!("统计周期{}天内未开展培训，建议安排培训。", duration_days),
            )
        } else {
            (
                defaults.long,
                RiskLevel::Critical,
                "❌ 严重缺训",
                format!(
                    "统计周期{}天（超过半年）内未开展任何培训，严重影响业务能力。",
                    duration_days
                ),
            )
        };

        TrainingScore {
            radar_score: score,
            original_score: score,
            penalty_coefficient: 1.0,
            stats: TrainingStatsSummary {
                total_ops: 0,
                fail_count: 0,
                duration_days,
            },
            risk_alert: RiskAlert {
                show: true,
                level,
                text: text.to_string(),
                description,
            },
            status_color: level.color(),
            alert_tag: text.to_string(),
        }
    }
}

fn normal() -> (f64, RiskLevel, String, String) {
    (1.0, RiskLevel::Normal, "✅ 能力达标".to_string(), String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{presets, AlgorithmConfig};

    fn config() -> AlgorithmConfig {
        AlgorithmConfig::from_value(&presets::standard_config()).unwrap()
    }

    fn pass(score: f64) -> TrainingSample {
        TrainingSample { score: Some(score), is_qualified: true, is_disqualified: false }
    }

    fn fail(score: f64) -> TrainingSample {
        TrainingSample { score: Some(score), is_qualified: false, is_disqualified: false }
    }

    #[test]
    fn test_no_records_by_duration() {
        let cfg = config();
        let engine = TrainingEngine::new(&cfg.training);

        let short = engine.with_penalty(&[], 30, None);
        assert_eq!(short.radar_score, 65.0);
        assert_eq!(short.risk_alert.level, RiskLevel::Normal);
        assert_eq!(short.status_color, StatusColor::Green);

        let mid = engine.with_penalty(&[], 120, None);
        assert_eq!(mid.radar_score, 50.0);
        assert_eq!(mid.status_color, StatusColor::Yellow);

        let long = engine.with_penalty(&[], 365, None);
        assert_eq!(long.radar_score, 0.0);
        assert_eq!(long.alert_tag, "❌ 严重缺训");
    }

    #[test]
    fn test_absolute_threshold() {
        let cfg = config();
        let records = vec![pass(90.0), fail(50.0), fail(40.0), pass(0.0)];
        let result = TrainingEngine::new(&cfg.training).with_penalty(&records, 30, Some(3.0));
        // 失格 3 次（含 0 分），基础分 (90+50+40+0)/4 = 45
        assert_eq!(result.stats.fail_count, 3);
        assert_eq!(result.original_score, 45.0);
        assert_eq!(result.radar_score, 22.5);
        assert_eq!(result.risk_alert.level, RiskLevel::Critical);
    }

    #[test]
    fn test_small_sample_high_risk() {
        let cfg = config();
        let records = vec![pass(90.0), pass(80.0), fail(70.0)];
        let result = TrainingEngine::new(&cfg.training).with_penalty(&records, 30, None);
        assert_eq!(result.penalty_coefficient, 0.7);
        assert_eq!(result.radar_score, 56.0);
        assert_eq!(result.status_color, StatusColor::Purple);
        assert!(result.risk_alert.show);
    }

    #[test]
    fn test_afr_large_sample() {
        let cfg = config();
        let engine = TrainingEngine::new(&cfg.training);

        // 10 次 1 次失格, 365 天 → AFR 1.0 → 偶发失格 0.9
        let mut records = vec![pass(90.0); 9];
        records.push(fail(90.0));
        let result = engine.with_penalty(&records, 365, Some(5.0));
        assert_eq!(result.penalty_coefficient, 0.9);
        assert_eq!(result.risk_alert.level, RiskLevel::Notice);
        assert_eq!(result.alert_tag, "⚠️ 偶发失格 (年化 1.0 次)");
        assert_eq!(result.radar_score, 81.0);

        // 2 次失格, 365 天 → AFR 2.0 → 频率偏高 0.7
        let mut records = vec![pass(90.0); 8];
        records.push(fail(90.0));
        records.push(fail(90.0));
        let result = engine.with_penalty(&records, 365, Some(5.0));
        assert_eq!(result.penalty_coefficient, 0.7);
        assert_eq!(result.risk_alert.level, RiskLevel::Warning);

        // 无失格 → 正常
        let result = engine.with_penalty(&vec![pass(88.0); 12], 365, None);
        assert_eq!(result.penalty_coefficient, 1.0);
        assert_eq!(result.alert_tag, "✅ 能力达标");
        assert!(!result.risk_alert.show);
    }

    #[test]
    fn test_disqualified_and_truncated_scores() {
        let sample = TrainingSample { score: Some(95.7), is_qualified: true, is_disqualified: true };
        assert!(sample.is_failed());
        assert_eq!(sample.score_value(), 95);
        let missing = TrainingSample { score: None, is_qualified: true, is_disqualified: false };
        assert!(missing.is_failed());
    }
}
