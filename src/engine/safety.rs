// ==========================================
// 班组管理系统 - 安全意识评分引擎（双轨）
// ==========================================
// 行为轨 (A): 月均违规频次，识别惯犯
// 严重性轨 (B): 单次扣分分段加权，识别高扣分
// 最终分 = min(A, B)
// ==========================================

use crate::config::algorithm::SafetyConfig;
use crate::domain::types::StatusColor;
use crate::engine::round_to;
use serde::Serialize;

const FULL_SCORE: f64 = 100.0;

/// 双轨评分结果
#[derive(Debug, Clone, Serialize)]
pub struct SafetyScore {
    pub score_a: f64,
    pub score_b: f64,
    pub final_score: f64,
    pub status_color: StatusColor,
    pub alert_tag: String,
    pub violation_count: usize,
    pub avg_freq: u32,
}

pub struct SafetyEngine<'a> {
    config: &'a SafetyConfig,
}

impl<'a> SafetyEngine<'a> {
    pub fn new(config: &'a SafetyConfig) -> Self {
        Self { config }
    }

    /// 双轨评分
    ///
    /// # 参数
    /// - `violations`: 各次违规扣分值
    /// - `months_active`: 统计周期月数（月度传 1）
    pub fn dual_track(&self, violations: &[f64], months_active: u32) -> SafetyScore {
        let count = violations.len();
        let avg_freq = if months_active > 0 {
            (count as f64 / months_active as f64).ceil() as u32
        } else {
            0
        };

        // 行为轨
        let behavior = &self.config.behavior_track;
        let band = |i: usize| behavior.freq_thresholds.get(i).copied().unwrap_or(f64::MAX);
        let multiplier = |i: usize| behavior.freq_multipliers.get(i).copied().unwrap_or(0.0);
        let freq = avg_freq as f64;
        let deduction_a = if freq <= band(0) {
            freq * multiplier(0)
        } else if freq <= band(1) {
            freq * multiplier(1)
        } else {
            freq * multiplier(2)
        };
        let score_a = (FULL_SCORE - deduction_a).max(0.0);

        // 严重性轨
        let severity = &self.config.severity_track;
        let mut deduction_b = 0.0;
        let mut has_critical = false;
        for &value in violations {
            let m = severity
                .score_ranges
                .iter()
                .find(|r| r.matches(value))
                .map(|r| r.multiplier)
                .unwrap_or(1.0);
            deduction_b += value * m;
            if value >= severity.critical_threshold {
                has_critical = true;
            }
        }
        let score_b = (FULL_SCORE - deduction_b).max(0.0);

        let final_score = score_a.min(score_b);
        let thresholds = &self.config.thresholds;
        let (status_color, alert_tag) = if final_score < thresholds.fail_score || has_critical {
            let tag = if has_critical {
                "⛔ 重大红线（存在高扣分）"
            } else {
                "⛔ 安全不合格"
            };
            (StatusColor::Red, tag)
        } else if final_score < thresholds.warning_score {
            let tag = if score_a < score_b {
                "⚠️ 高频违规风险"
            } else {
                "⚠️ 扣分过多风险"
            };
            (StatusColor::Orange, tag)
        } else {
            (StatusColor::Green, "✅ 安全")
        };

        SafetyScore {
            score_a: round_to(score_a, 1),
            score_b: round_to(score_b, 1),
            final_score: round_to(final_score, 1),
            status_color,
            alert_tag: alert_tag.to_string(),
            violation_count: count,
            avg_freq,
        }
    }
}
