// ==========================================
// 班组管理系统 - 算法配置（强类型视图）
// ==========================================
// 存储: algorithm_active_config.config_data (JSON)
// 职责: 将 JSON 配置解析为评分引擎使用的强类型结构
// 说明: 可选配置节/字段缺省时使用标准档默认值
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 评分算法配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    pub performance: PerformanceConfig,
    pub safety: SafetyConfig,
    pub training: TrainingConfig,
    pub comprehensive: ComprehensiveConfig,
    pub key_personnel: KeyPersonnelConfig,
    #[serde(default)]
    pub stability_new: StabilityConfig,
    #[serde(default)]
    pub learning_new: LearningConfig,
    #[serde(default)]
    pub nine_grid: NineGridConfig,
}

impl AlgorithmConfig {
    /// 从 JSON 配置解析
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        AlgorithmConfig::deserialize(value)
    }
}

// ==========================================
// 绩效
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    pub grade_coefficients: BTreeMap<String, f64>,
    pub grade_ranges: BTreeMap<String, GradeRange>,
    pub contamination_rules: ContaminationRules,
    #[serde(default)]
    pub time_decay: TimeDecayConfig,
}

impl PerformanceConfig {
    /// 等级系数，未配置的等级按 1.0
    pub fn coefficient(&self, grade: &str) -> f64 {
        self.grade_coefficients.get(grade).copied().unwrap_or(1.0)
    }

    pub fn range(&self, grade: &str) -> Option<&GradeRange> {
        self.grade_ranges.get(grade)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRange {
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radar_override: Option<f64>,
}

impl GradeRange {
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// 污点熔断规则
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContaminationRules {
    pub d_count_threshold: f64,
    pub c_count_threshold: f64,
    pub d_cap_score: f64,
    pub c_cap_score: f64,
}

/// D/C 级时间衰减
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeDecayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_decay_months")]
    pub decay_months: i32,
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
}

impl Default for TimeDecayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            decay_months: default_decay_months(),
            decay_rate: default_decay_rate(),
        }
    }
}

// ==========================================
// 安全（双轨）
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    pub behavior_track: BehaviorTrack,
    pub severity_track: SeverityTrack,
    pub thresholds: SafetyThresholds,
}

/// 行为轨：月均频次分档
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorTrack {
    pub freq_thresholds: Vec<f64>,
    pub freq_multipliers: Vec<f64>,
}

/// 严重性轨：单次扣分分段系数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityTrack {
    pub score_ranges: Vec<ScoreRange>,
    pub critical_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub multiplier: f64,
}

impl ScoreRange {
    /// 区间命中判定: 仅 max 表示 < max，仅 min 表示 >= min，两者都有为 [min, max)
    pub fn matches(&self, value: f64) -> bool {
        match (self.min, self.max) {
            (None, Some(max)) => value < max,
            (Some(min), Some(max)) => min <= value && value < max,
            (Some(min), None) => value >= min,
            (None, None) => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyThresholds {
    pub fail_score: f64,
    pub warning_score: f64,
}

// ==========================================
// 培训
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub penalty_rules: PenaltyRules,
    pub duration_thresholds: DurationThresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltyRules {
    pub absolute_threshold: AbsoluteThreshold,
    pub small_sample: SmallSample,
    #[serde(default)]
    pub afr_thresholds: Vec<AfrRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub afr_thresholds_new_employee: Option<Vec<AfrRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub afr_thresholds_experienced: Option<Vec<AfrRule>>,
}

impl PenaltyRules {
    /// 按新老员工选择年化失格阈值，缺省回退到通用阈值
    pub fn afr_rules_for(&self, is_new_employee: bool) -> &[AfrRule] {
        let specific = if is_new_employee {
            self.afr_thresholds_new_employee.as_deref()
        } else {
            self.afr_thresholds_experienced.as_deref()
        };
        specific.unwrap_or(&self.afr_thresholds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbsoluteThreshold {
    pub fail_count: u32,
    pub coefficient: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmallSample {
    pub sample_size: u32,
    pub coefficient: f64,
}

/// 年化失格频率 (AFR) 规则
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AfrRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub coefficient: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl AfrRule {
    /// 触发下限: 优先 threshold，其次 min
    pub fn limit(&self) -> Option<f64> {
        self.threshold.or(self.min)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationThresholds {
    pub short_term_days: i64,
    pub mid_term_days: i64,
    pub default_scores: DefaultScores,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultScores {
    pub short: f64,
    pub mid: f64,
    pub long: f64,
}

// ==========================================
// 综合 / 重点人员
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveConfig {
    pub score_weights: ScoreWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_w_performance")]
    pub performance: f64,
    #[serde(default = "default_w_safety")]
    pub safety: f64,
    #[serde(default = "default_w_training")]
    pub training: f64,
    #[serde(default = "default_w_stability")]
    pub stability: f64,
    #[serde(default = "default_w_learning")]
    pub learning: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPersonnelConfig {
    pub comprehensive_threshold: f64,
    #[serde(default = "default_monthly_violation_threshold")]
    pub monthly_violation_threshold: f64,
}

// ==========================================
// 稳定度（波动型）
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityMetric {
    MeanAbsDelta,
    Mad,
    Cv,
}

impl VolatilityMetric {
    pub fn label(&self) -> &'static str {
        match self {
            VolatilityMetric::MeanAbsDelta => "Mean |Δ|",
            VolatilityMetric::Mad => "MAD",
            VolatilityMetric::Cv => "CV",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityConfig {
    #[serde(default = "default_window_months")]
    pub window_months: u32,
    #[serde(default = "default_min_effective_months")]
    pub min_effective_months: u32,
    #[serde(default = "default_volatility_metric")]
    pub volatility_metric: VolatilityMetric,
    #[serde(default = "default_high_vol_threshold")]
    pub high_vol_threshold: f64,
    #[serde(default = "default_k_multiplier")]
    pub k_multiplier: f64,
    #[serde(default = "default_score_floor")]
    pub score_floor: f64,
    #[serde(default = "default_score_ceiling")]
    pub score_ceiling: f64,
    #[serde(default = "default_score_map_low")]
    pub score_map_low: f64,
    #[serde(default = "default_score_map_high")]
    pub score_map_high: f64,
    #[serde(default = "default_score_map_low_score")]
    pub score_map_low_score: f64,
    #[serde(default = "default_score_map_high_score")]
    pub score_map_high_score: f64,
    #[serde(default)]
    pub label_cutoffs: LabelCutoffs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_level_threshold: Option<f64>,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            window_months: default_window_months(),
            min_effective_months: default_min_effective_months(),
            volatility_metric: default_volatility_metric(),
            high_vol_threshold: default_high_vol_threshold(),
            k_multiplier: default_k_multiplier(),
            score_floor: default_score_floor(),
            score_ceiling: default_score_ceiling(),
            score_map_low: default_score_map_low(),
            score_map_high: default_score_map_high(),
            score_map_low_score: default_score_map_low_score(),
            score_map_high_score: default_score_map_high_score(),
            label_cutoffs: LabelCutoffs::default(),
            low_level_threshold: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelCutoffs {
    #[serde(default = "default_stable_cut")]
    pub stable: f64,
    #[serde(default = "default_medium_cut")]
    pub medium: f64,
}

impl Default for LabelCutoffs {
    fn default() -> Self {
        Self {
            stable: default_stable_cut(),
            medium: default_medium_cut(),
        }
    }
}

// ==========================================
// 学习能力（动态水位 + 趋势系数）
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    #[serde(default = "default_ceiling_floor")]
    pub trend_ceiling_floor: f64,
    #[serde(default = "default_warning_ratio")]
    pub trend_warning_ratio: f64,
    #[serde(default = "default_warning_floor")]
    pub trend_warning_floor: f64,
    #[serde(default = "default_critical_ratio")]
    pub trend_critical_ratio: f64,
    #[serde(default = "default_critical_floor")]
    pub trend_critical_floor: f64,
    #[serde(default = "default_historical_baseline")]
    pub historical_baseline: f64,
    #[serde(default = "default_factor_reward", alias = "factor_improvement")]
    pub factor_reward: f64,
    #[serde(default = "default_factor_stable")]
    pub factor_stable: f64,
    #[serde(default = "default_factor_safe_fluctuation")]
    pub factor_safe_fluctuation: f64,
    #[serde(default = "default_factor_mitigation", alias = "factor_high_improvement")]
    pub factor_mitigation: f64,
    #[serde(default = "default_factor_warning")]
    pub factor_warning: f64,
    #[serde(default = "default_factor_solidification")]
    pub factor_solidification: f64,
    #[serde(default = "default_factor_deterioration")]
    pub factor_deterioration: f64,
    #[serde(default = "default_time_decay_rate")]
    pub time_decay_rate: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            trend_ceiling_floor: default_ceiling_floor(),
            trend_warning_ratio: default_warning_ratio(),
            trend_warning_floor: default_warning_floor(),
            trend_critical_ratio: default_critical_ratio(),
            trend_critical_floor: default_critical_floor(),
            historical_baseline: default_historical_baseline(),
            factor_reward: default_factor_reward(),
            factor_stable: default_factor_stable(),
            factor_safe_fluctuation: default_factor_safe_fluctuation(),
            factor_mitigation: default_factor_mitigation(),
            factor_warning: default_factor_warning(),
            factor_solidification: default_factor_solidification(),
            factor_deterioration: default_factor_deterioration(),
            time_decay_rate: default_time_decay_rate(),
        }
    }
}

// ==========================================
// 九宫格
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NineGridConfig {
    #[serde(default)]
    pub y_axis_weights: YAxisWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YAxisWeights {
    #[serde(default = "default_y_stability")]
    pub stability: f64,
    #[serde(default = "default_y_learning")]
    pub learning: f64,
}

impl Default for YAxisWeights {
    fn default() -> Self {
        Self {
            stability: default_y_stability(),
            learning: default_y_learning(),
        }
    }
}

// ==========================================
// 默认值
// ==========================================

fn default_true() -> bool {
    true
}
fn default_decay_months() -> i32 {
    6
}
fn default_decay_rate() -> f64 {
    0.9
}
fn default_w_performance() -> f64 {
    0.35
}
fn default_w_safety() -> f64 {
    0.30
}
fn default_w_training() -> f64 {
    0.20
}
fn default_w_stability() -> f64 {
    0.10
}
fn default_w_learning() -> f64 {
    0.05
}
fn default_monthly_violation_threshold() -> f64 {
    3.0
}
fn default_window_months() -> u32 {
    12
}
fn default_min_effective_months() -> u32 {
    6
}
fn default_volatility_metric() -> VolatilityMetric {
    VolatilityMetric::MeanAbsDelta
}
fn default_high_vol_threshold() -> f64 {
    0.0667
}
fn default_k_multiplier() -> f64 {
    1.2
}
fn default_score_floor() -> f64 {
    40.0
}
fn default_score_ceiling() -> f64 {
    100.0
}
fn default_score_map_low() -> f64 {
    1.09
}
fn default_score_map_high() -> f64 {
    6.0
}
fn default_score_map_low_score() -> f64 {
    90.0
}
fn default_score_map_high_score() -> f64 {
    60.0
}
fn default_stable_cut() -> f64 {
    75.0
}
fn default_medium_cut() -> f64 {
    60.0
}
fn default_ceiling_floor() -> f64 {
    5.0
}
fn default_warning_ratio() -> f64 {
    1.5
}
fn default_warning_floor() -> f64 {
    2.0
}
fn default_critical_ratio() -> f64 {
    3.0
}
fn default_critical_floor() -> f64 {
    5.0
}
fn default_historical_baseline() -> f64 {
    3.0
}
fn default_factor_reward() -> f64 {
    1.2
}
fn default_factor_stable() -> f64 {
    1.0
}
fn default_factor_safe_fluctuation() -> f64 {
    0.9
}
fn default_factor_mitigation() -> f64 {
    0.8
}
fn default_factor_warning() -> f64 {
    0.6
}
fn default_factor_solidification() -> f64 {
    0.4
}
fn default_factor_deterioration() -> f64 {
    0.3
}
fn default_time_decay_rate() -> f64 {
    0.2
}
fn default_y_stability() -> f64 {
    0.4
}
fn default_y_learning() -> f64 {
    0.6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::presets;

    #[test]
    fn test_parse_all_builtin_presets() {
        for preset in presets::builtin_presets() {
            let cfg = AlgorithmConfig::from_value(&preset.config)
                .unwrap_or_else(|e| panic!("预设 {} 解析失败: {}", preset.key, e));
            assert_eq!(cfg.performance.coefficient("B+"), 1.0);
            assert!(cfg.training.penalty_rules.afr_thresholds.len() == 3);
        }
    }

    #[test]
    fn test_learning_aliases_and_defaults() {
        let cfg = AlgorithmConfig::from_value(&presets::standard_config()).unwrap();
        // factor_improvement 作为 factor_reward 的别名
        assert_eq!(cfg.learning_new.factor_reward, 1.2);
        assert_eq!(cfg.learning_new.factor_deterioration, 0.0);
        // 未配置项使用默认值
        assert_eq!(cfg.learning_new.factor_mitigation, 0.8);
        assert_eq!(cfg.stability_new.window_months, 12);
        assert!(cfg.performance.time_decay.enabled);
    }

    #[test]
    fn test_score_range_matches() {
        let lower = ScoreRange { min: None, max: Some(3.0), multiplier: 1.0 };
        let mid = ScoreRange { min: Some(3.0), max: Some(5.0), multiplier: 2.5 };
        let upper = ScoreRange { min: Some(5.0), max: None, multiplier: 5.0 };
        assert!(lower.matches(2.9) && !lower.matches(3.0));
        assert!(mid.matches(3.0) && !mid.matches(5.0));
        assert!(upper.matches(5.0));
    }

    #[test]
    fn test_afr_rules_fallback() {
        let cfg = AlgorithmConfig::from_value(&presets::standard_config()).unwrap();
        let rules = &cfg.training.penalty_rules;
        assert_eq!(rules.afr_rules_for(true).len(), 3);
        assert_eq!(rules.afr_rules_for(false)[0].limit(), Some(2.5));
    }
}
