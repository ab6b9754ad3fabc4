// ==========================================
// 班组管理系统 - 内置算法预设方案
// ==========================================
// 预设: strict(严格) / standard(标准) / lenient(宽松)
// 严格/宽松档在标准档基础上覆写惩罚力度相关参数
// ==========================================

use serde_json::{json, Value};

/// 内置预设
#[derive(Debug, Clone)]
pub struct BuiltinPreset {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub config: Value,
}

/// 全部内置预设（严格/标准/宽松）
pub fn builtin_presets() -> Vec<BuiltinPreset> {
    vec![
        BuiltinPreset {
            key: "strict",
            name: "严格",
            description: "更严格的惩罚力度，适用于高要求场景",
            config: strict_config(),
        },
        BuiltinPreset {
            key: "standard",
            name: "标准",
            description: "标准惩罚力度，平衡公平与激励",
            config: standard_config(),
        },
        BuiltinPreset {
            key: "lenient",
            name: "宽松",
            description: "较宽松的惩罚力度，适用于培养阶段",
            config: lenient_config(),
        },
    ]
}

/// 标准档
pub fn standard_config() -> Value {
    json!({
        "performance": {
            "grade_coefficients": {"D": 0.0, "C": 0.6, "B": 0.9, "B+": 1.0, "A": 1.1},
            "grade_ranges": {
                "D": {"min": 0, "max": 79.9, "radar_override": 50},
                "C": {"min": 80, "max": 89.9},
                "B": {"min": 90, "max": 94.9},
                "B+": {"min": 95, "max": 99.9},
                "A": {"min": 100, "max": 110}
            },
            "contamination_rules": {
                "d_count_threshold": 1,
                "c_count_threshold": 2,
                "d_cap_score": 90,
                "c_cap_score": 94.9
            }
        },
        "safety": {
            "behavior_track": {
                "freq_thresholds": [2, 5, 6],
                "freq_multipliers": [2, 5, 10]
            },
            "severity_track": {
                "score_ranges": [
                    {"max": 3, "multiplier": 1.0},
                    {"min": 3, "max": 5, "multiplier": 2.5},
                    {"min": 5, "multiplier": 5.0}
                ],
                "critical_threshold": 12
            },
            "thresholds": {"fail_score": 60, "warning_score": 90}
        },
        "training": {
            "penalty_rules": {
                "absolute_threshold": {"fail_count": 3, "coefficient": 0.5},
                "small_sample": {"sample_size": 10, "coefficient": 0.7},
                "afr_thresholds": [
                    {"min": 2.5, "coefficient": 0.5, "label": "高频失格"},
                    {"min": 1.5, "max": 2.5, "coefficient": 0.7, "label": "频率偏高"},
                    {"min": 0.5, "max": 1.5, "coefficient": 0.9, "label": "偶发失格"}
                ]
            },
            "duration_thresholds": {
                "short_term_days": 60,
                "mid_term_days": 180,
                "default_scores": {"short": 65, "mid": 50, "long": 0}
            }
        },
        "comprehensive": {
            "score_weights": {
                "performance": 0.35,
                "safety": 0.30,
                "training": 0.20,
                "stability": 0.10,
                "learning": 0.05
            }
        },
        "key_personnel": {
            "comprehensive_threshold": 70,
            "monthly_violation_threshold": 3
        },
        "learning": {
            "potential_threshold": 0.5,
            "decline_threshold": -0.2,
            "decline_penalty": 0.8,
            "slope_amplifier": 10
        },
        "stability_new": {
            "base_stability": 100.0,
            "violation_penalty": 10.0,
            "redline_penalty": 40.0,
            "safety_cv_limit": 1.2
        },
        "learning_new": {
            "trend_warning_ratio": 1.5,
            "trend_warning_floor": 2,
            "trend_critical_ratio": 3.0,
            "trend_critical_floor": 5,
            "factor_improvement": 1.2,
            "factor_solidification": 0.4,
            "factor_deterioration": 0.0
        },
        "nine_grid": {
            "y_axis_weights": {"stability": 0.4, "learning": 0.6}
        }
    })
}

/// 严格档
pub fn strict_config() -> Value {
    let mut cfg = standard_config();
    cfg["performance"]["contamination_rules"] = json!({
        "d_count_threshold": 1, "c_count_threshold": 2,
        "d_cap_score": 85, "c_cap_score": 92
    });
    cfg["safety"]["severity_track"]["critical_threshold"] = json!(10);
    cfg["training"]["penalty_rules"]["absolute_threshold"]["coefficient"] = json!(0.4);
    cfg["training"]["penalty_rules"]["small_sample"]["coefficient"] = json!(0.6);
    cfg["training"]["penalty_rules"]["afr_thresholds"] = json!([
        {"min": 2.5, "coefficient": 0.4, "label": "高频失格"},
        {"min": 1.5, "max": 2.5, "coefficient": 0.6, "label": "频率偏高"},
        {"min": 0.5, "max": 1.5, "coefficient": 0.85, "label": "偶发失格"}
    ]);
    cfg["key_personnel"] = json!({
        "comprehensive_threshold": 75,
        "monthly_violation_threshold": 2
    });
    cfg["learning"] = json!({
        "potential_threshold": 0.6,
        "decline_threshold": -0.2,
        "decline_penalty": 0.7,
        "slope_amplifier": 10
    });
    cfg["stability_new"] = json!({
        "base_stability": 100.0,
        "violation_penalty": 15.0,
        "redline_penalty": 50.0,
        "safety_cv_limit": 1.0
    });
    cfg["learning_new"] = json!({
        "trend_warning_ratio": 1.3,
        "trend_warning_floor": 2,
        "trend_critical_ratio": 2.5,
        "trend_critical_floor": 4,
        "factor_improvement": 1.3,
        "factor_solidification": 0.3,
        "factor_deterioration": 0.0
    });
    cfg
}

/// 宽松档
pub fn lenient_config() -> Value {
    let mut cfg = standard_config();
    cfg["performance"]["contamination_rules"] = json!({
        "d_count_threshold": 1, "c_count_threshold": 3,
        "d_cap_score": 95, "c_cap_score": 97
    });
    cfg["safety"]["severity_track"]["critical_threshold"] = json!(15);
    cfg["training"]["penalty_rules"]["absolute_threshold"] =
        json!({"fail_count": 4, "coefficient": 0.6});
    cfg["training"]["penalty_rules"]["small_sample"]["coefficient"] = json!(0.8);
    cfg["training"]["penalty_rules"]["afr_thresholds"] = json!([
        {"min": 3.0, "coefficient": 0.6, "label": "高频失格"},
        {"min": 2.0, "max": 3.0, "coefficient": 0.8, "label": "频率偏高"},
        {"min": 0.8, "max": 2.0, "coefficient": 0.95, "label": "偶发失格"}
    ]);
    cfg["key_personnel"] = json!({
        "comprehensive_threshold": 65,
        "monthly_violation_threshold": 4
    });
    cfg["learning"] = json!({
        "potential_threshold": 0.4,
        "decline_threshold": -0.2,
        "decline_penalty": 0.9,
        "slope_amplifier": 10
    });
    cfg["stability_new"] = json!({
        "base_stability": 100.0,
        "violation_penalty": 8.0,
        "redline_penalty": 30.0,
        "safety_cv_limit": 1.5
    });
    cfg["learning_new"] = json!({
        "trend_warning_ratio": 2.0,
        "trend_warning_floor": 3,
        "trend_critical_ratio": 4.0,
        "trend_critical_floor": 6,
        "factor_improvement": 1.1,
        "factor_solidification": 0.5,
        "factor_deterioration": 0.0
    });
    cfg
}

/// 按 key 查找内置预设
pub fn find_builtin(key: &str) -> Option<BuiltinPreset> {
    builtin_presets().into_iter().find(|p| p.key == key)
}
