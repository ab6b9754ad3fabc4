// ==========================================
// 班组管理系统 - 绩效评分引擎
// ==========================================
// 职责: 月度快照 / 周期加权 / 季度等级汇总
// 输入: 绩效等级序列 + 算法配置
// 输出: 雷达值 + 状态颜色 + 警示标签
// ==========================================

use crate::config::algorithm::PerformanceConfig;
use crate::domain::types::StatusColor;
use crate::engine::month::YearMonth;
use crate::engine::round_to;
use serde::Serialize;

/// 周期算法基准分（平均系数 × 95）
const PERIOD_BASE: f64 = 95.0;
/// 周期算法上限
const PERIOD_CEILING: f64 = 110.0;
/// 缺省等级
pub const DEFAULT_GRADE: &str = "B+";
/// 季度等级映射顺序（由高到低）
const QUARTER_GRADE_ORDER: [&str; 4] = ["A", "B+", "B", "C"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreMode {
    Monthly,
    Period,
}

/// 月度快照结果
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyPerformanceScore {
    pub radar_value: f64,
    pub display_label: String,
    pub status_color: StatusColor,
    pub alert_tag: String,
    pub grade: String,
    pub mode: ScoreMode,
}

/// 周期加权结果
#[derive(Debug, Clone, Serialize)]
pub struct PeriodPerformanceScore {
    pub radar_value: f64,
    pub display_label: String,
    pub status_color: StatusColor,
    pub alert_tag: String,
    pub mode: ScoreMode,
    pub d_count_raw: u32,
    pub d_count_effective: f64,
    pub time_decay_applied: bool,
}

/// 季度计算结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarterGrade {
    pub score: f64,
    pub grade: String,
}

/// 等级规范化: 去空白、转大写，空值按 B+
pub fn normalize_grade(grade: Option<&str>) -> String {
    match grade.map(str::trim).filter(|g| !g.is_empty()) {
        Some(g) => g.to_uppercase(),
        None => DEFAULT_GRADE.to_string(),
    }
}

/// 季度包含的月份 (3q-2 ..= 3q)
pub fn quarter_months(quarter: u32) -> [u32; 3] {
    let last = quarter * 3;
    [last - 2, last - 1, last]
}

// ==========================================
// PerformanceEngine - 绩效评分引擎
// ==========================================
pub struct PerformanceEngine<'a> {
    config: &'a PerformanceConfig,
}

impl<'a> PerformanceEngine<'a> {
    pub fn new(config: &'a PerformanceConfig) -> Self {
        Self { config }
    }

    /// 月度快照
    ///
    /// # 参数
    /// - `grade`: 当月等级（未知等级按 B+ 处理）
    /// - `raw_score`: 原始计算分
    pub fn monthly(&self, grade: Option<&str>, raw_score: f64) -> MonthlyPerformanceScore {
        let normalized = normalize_grade(grade);
        let grade = match normalized.as_str() {
            "D" | "C" | "B" | "B+" | "A" => normalized,
            _ => DEFAULT_GRADE.to_string(),
        };

        let clamped = |g: &str| {
            self.config
                .range(g)
                .map(|r| r.clamp(raw_score))
                .unwrap_or(raw_score)
        };

        let (radar_value, status_color, alert_tag) = match grade.as_str() {
            "D" => {
                let value = self
                    .config
                    .range("D")
                    .map(|r| r.radar_override.unwrap_or(r.min))
                    .unwrap_or(raw_score);
                (value, StatusColor::Red, "⛔ 绩效不合格")
            }
            "C" => (clamped("C"), StatusColor::Orange, "⚠️ 绩效预警"),
            "B" => (clamped("B"), StatusColor::Orange, "⚠️ 未达基准"),
            "A" => (clamped("A"), StatusColor::Green, "✅ 优秀"),
            _ => (clamped("B+"), StatusColor::Green, "✅ 达标"),
        };

        MonthlyPerformanceScore {
            radar_value: round_to(radar_value, 1),
            display_label: format!("{}级 (系数{:?})", grade, self.config.coefficient(&grade)),
            status_color,
            alert_tag: alert_tag.to_string(),
            grade,
            mode: ScoreMode::Monthly,
        }
    }

    /// 周期加权（跨月/季度/年度）
    ///
    /// # 参数
    /// - `grades`: 周期内各月等级
    /// - `months`: 各等级对应月份；与 grades 等长且启用衰减时按距今月数衰减 D/C 计数
    /// - `today`: 衰减基准月
    pub fn period(
        &self,
        grades: &[Option<String>],
        months: Option<&[YearMonth]>,
        today: YearMonth,
    ) -> PeriodPerformanceScore {
        if grades.is_empty() {
            return PeriodPerformanceScore {
                radar_value: PERIOD_BASE,
                display_label: "暂无数据".to_string(),
                status_color: StatusColor::Green,
                alert_tag: "✅ 暂无数据".to_string(),
                mode: ScoreMode::Period,
                d_count_raw: 0,
                d_count_effective: 0.0,
                time_decay_applied: false,
            };
        }

        let decay = &self.config.time_decay;
        let months = months.filter(|m| decay.enabled && m.len() == grades.len());
        let use_decay = months.is_some();

        let mut coeff_sum = 0.0;
        let (mut d_raw, mut c_raw) = (0u32, 0u32);
        let (mut d_eff, mut c_eff) = (0.0f64, 0.0f64);

        for (i, grade) in grades.iter().enumerate() {
            let grade = normalize_grade(grade.as_deref());
            coeff_sum += self.config.coefficient(&grade);

            let weight = match months {
                Some(ms) => {
                    let months_ago = today.months_since(&ms[i]);
                    if months_ago <= decay.decay_months {
                        decay.decay_rate.powi(months_ago)
                    } else {
                        0.0
                    }
                }
                None => 1.0,
            };
            match grade.as_str() {
                "D" => {
                    d_raw += 1;
                    d_eff += weight;
                }
                "C" => {
                    c_raw += 1;
                    c_eff += weight;
                }
                _ => {}
            }
        }

        let avg_coeff = coeff_sum / grades.len() as f64;
        let base_score = avg_coeff * PERIOD_BASE;
        let rules = &self.config.contamination_rules;

        let (final_score, status_color, alert_tag) = if d_eff >= rules.d_count_threshold {
            let tag = if use_decay && d_eff < d_raw as f64 {
                format!("⛔ 存在D级考核 (有效{:.1}次)", d_eff)
            } else {
                "⛔ 存在D级考核".to_string()
            };
            (base_score.min(rules.d_cap_score), StatusColor::Red, tag)
        } else if c_eff >= rules.c_count_threshold {
            let tag = if use_decay && c_eff < c_raw as f64 {
                format!("⚠️ 多次C级预警 (有效{:.1}次)", c_eff)
            } else {
                "⚠️ 多次C级预警".to_string()
            };
            (base_score.min(rules.c_cap_score), StatusColor::Orange, tag)
        } else {
            let score = base_score.min(PERIOD_CEILING);
            let (color, tag) = if score >= 95.0 {
                (StatusColor::Green, "✅ 综合达标")
            } else if score >= 80.0 {
                (StatusColor::Orange, "⚠️ 未达基准")
            } else {
                (StatusColor::Red, "⛔ 综合不合格")
            };
            (score, color, tag.to_string())
        };

        PeriodPerformanceScore {
            radar_value: round_to(final_score, 1),
            display_label: format!("平均系数{:.2}", avg_coeff),
            status_color,
            alert_tag,
            mode: ScoreMode::Period,
            d_count_raw: d_raw,
            d_count_effective: round_to(d_eff, 2),
            time_decay_applied: use_decay,
        }
    }

    /// 季度等级: 周期算法（不衰减）得分按 grade_ranges 下限映射
    ///
    /// 无月度记录时返回 None
    pub fn quarter_grade(&self, grades: &[Option<String>]) -> Option<QuarterGrade> {
        if grades.is_empty() {
            return None;
        }
        // 季度汇总不做时间衰减，months 传 None
        let score = self
            .period(grades, None, YearMonth { year: 0, month: 1 })
            .radar_value;
        Some(QuarterGrade {
            score,
            grade: self.grade_for_score(score),
        })
    }

    /// 有效等级: 有等级取等级；仅有得分时按 grade_ranges 由分数推出
    pub fn effective_grade(&self, grade: Option<&str>, score: Option<f64>) -> Option<String> {
        match grade.map(str::trim).filter(|g| !g.is_empty()) {
            Some(g) => Some(g.to_uppercase()),
            None => score.map(|s| self.grade_for_score(s)),
        }
    }

    /// 分数映射等级: 依次检查 A / B+ / B / C 的下限，均未达到为 D
    pub fn grade_for_score(&self, score: f64) -> String {
        QUARTER_GRADE_ORDER
            .iter()
            .find(|g| self.config.range(g).is_some_and(|r| score >= r.min))
            .map(|g| g.to_string())
            .unwrap_or_else(|| "D".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{presets, AlgorithmConfig};

    fn config() -> AlgorithmConfig {
        AlgorithmConfig::from_value(&presets::standard_config()).unwrap()
    }

    fn grades(list: &[&str]) -> Vec<Option<String>> {
        list.iter().map(|g| Some(g.to_string())).collect()
    }

    fn ym(s: &str) -> YearMonth {
        YearMonth::parse(s).unwrap()
    }

    #[test]
    fn test_monthly_grade_rules() {
        let cfg = config();
        let engine = PerformanceEngine::new(&cfg.performance);

        let d = engine.monthly(Some("d"), 88.0);
        assert_eq!(d.radar_value, 50.0);
        assert_eq!(d.status_color, StatusColor::Red);
        assert_eq!(d.grade, "D");

        let c = engine.monthly(Some("C"), 95.0);
        assert_eq!(c.radar_value, 89.9);
        assert_eq!(c.alert_tag, "⚠️ 绩效预警");

        let a = engine.monthly(Some("A"), 95.0);
        assert_eq!(a.radar_value, 100.0);
        assert_eq!(a.display_label, "A级 (系数1.1)");

        let unknown = engine.monthly(Some("X"), 97.0);
        assert_eq!(unknown.grade, "B+");
        assert_eq!(unknown.radar_value, 97.0);
        assert_eq!(unknown.display_label, "B+级 (系数1.0)");

        let empty = engine.monthly(None, 95.0);
        assert_eq!(empty.grade, "B+");
    }

    #[test]
    fn test_period_empty_and_average() {
        let cfg = config();
        let engine = PerformanceEngine::new(&cfg.performance);
        let today = ym("2024-06");

        let empty = engine.period(&[], None, today);
        assert_eq!(empty.radar_value, 95.0);
        assert_eq!(empty.display_label, "暂无数据");

        let all_good = engine.period(&grades(&["B+", "A", "B+"]), None, today);
        // (1.0 + 1.1 + 1.0) / 3 * 95 = 98.17
        assert_eq!(all_good.radar_value, 98.2);
        assert_eq!(all_good.status_color, StatusColor::Green);
        assert_eq!(all_good.display_label, "平均系数1.03");
    }

    #[test]
    fn test_period_contamination_caps() {
        let cfg = config();
        let engine = PerformanceEngine::new(&cfg.performance);
        let today = ym("2024-06");

        let with_d = engine.period(&grades(&["A", "A", "D"]), None, today);
        // 平均系数 0.733 * 95 = 69.67，低于 D 封顶分 90
        assert_eq!(with_d.radar_value, 69.7);
        assert_eq!(with_d.status_color, StatusColor::Red);
        assert_eq!(with_d.alert_tag, "⛔ 存在D级考核");

        let two_c = engine.period(&grades(&["A", "C", "C", "A", "A", "A"]), None, today);
        // (1.1*4 + 0.6*2)/6 * 95 = 88.67
        assert_eq!(two_c.radar_value, 88.7);
        assert_eq!(two_c.alert_tag, "⚠️ 多次C级预警");
    }

    #[test]
    fn test_period_time_decay_reduces_old_d() {
        let cfg = config();
        let engine = PerformanceEngine::new(&cfg.performance);
        let today = ym("2024-12");

        // D 级发生在 8 个月前，超过衰减窗口，不再计入有效次数
        let old = engine.period(
            &grades(&["D", "A", "A"]),
            Some(&[ym("2024-04"), ym("2024-11"), ym("2024-12")]),
            today,
        );
        assert!(old.time_decay_applied);
        assert_eq!(old.d_count_raw, 1);
        assert_eq!(old.d_count_effective, 0.0);
        assert!(!old.alert_tag.contains("D级"));

        // 1 个月前的 D 级有效 0.9 次，低于阈值 1
        let recent = engine.period(
            &grades(&["D", "A"]),
            Some(&[ym("2024-11"), ym("2024-12")]),
            today,
        );
        assert_eq!(recent.d_count_effective, 0.9);

        // 月份数量不一致时不衰减
        let mismatch = engine.period(&grades(&["D", "A"]), Some(&[ym("2024-11")]), today);
        assert!(!mismatch.time_decay_applied);
        assert_eq!(mismatch.alert_tag, "⛔ 存在D级考核");
    }

    #[test]
    fn test_quarter_grade_mapping() {
        let cfg = config();
        let engine = PerformanceEngine::new(&cfg.performance);

        assert_eq!(quarter_months(1), [1, 2, 3]);
        assert_eq!(quarter_months(4), [10, 11, 12]);
        assert!(engine.quarter_grade(&[]).is_none());

        let q = engine.quarter_grade(&grades(&["B+", "B+", "B+"])).unwrap();
        assert_eq!(q, QuarterGrade { score: 95.0, grade: "B+".to_string() });

        let q = engine.quarter_grade(&grades(&["A", "A", "A"])).unwrap();
        assert_eq!(q.grade, "A");

        let q = engine.quarter_grade(&grades(&["B+", "B+", "D"])).unwrap();
        // (1.0 + 1.0 + 0.0) / 3 * 95 = 63.3 → D
        assert_eq!(q.grade, "D");

        let q = engine.quarter_grade(&grades(&["B", "B", "B"])).unwrap();
        // 0.9 * 95 = 85.5 → C
        assert_eq!(q.grade, "C");
    }

    #[test]
    fn test_effective_grade_from_score() {
        let cfg = config();
        let engine = PerformanceEngine::new(&cfg.performance);
        assert_eq!(engine.effective_grade(Some(" c "), Some(100.0)).as_deref(), Some("C"));
        assert_eq!(engine.effective_grade(None, Some(60.0)).as_deref(), Some("D"));
        assert_eq!(engine.effective_grade(Some(""), Some(96.0)).as_deref(), Some("B+"));
        assert_eq!(engine.effective_grade(None, Some(100.0)).as_deref(), Some("A"));
        assert!(engine.effective_grade(None, None).is_none());
    }
}
