// ==========================================
// 班组管理系统 - 算法配置校验
// ==========================================
// 职责: 在保存自定义配置/更新预设前校验 JSON 结构与取值范围
// 返回: (是否通过, 提示信息)
// ==========================================

use crate::config::algorithm::AlgorithmConfig;
use crate::i18n::t;
use serde_json::Value;

const REQUIRED_SECTIONS: [&str; 5] = [
    "performance",
    "safety",
    "training",
    "comprehensive",
    "key_personnel",
];

const GRADES: [&str; 5] = ["D", "C", "B", "B+", "A"];

/// 校验算法配置
pub fn validate_config(config: &Value) -> (bool, String) {
    match check(config) {
        Ok(()) => (true, t("config.validated")),
        Err(msg) => (false, msg),
    }
}

fn check(config: &Value) -> Result<(), String> {
    let root = config
        .as_object()
        .ok_or_else(|| "配置必须是JSON对象".to_string())?;

    for section in REQUIRED_SECTIONS {
        if !root.contains_key(section) {
            return Err(format!("缺少必需的配置节: {}", section));
        }
    }

    // 绩效等级系数
    let coefficients = &config["performance"]["grade_coefficients"];
    for grade in GRADES {
        let value = coefficients[grade]
            .as_f64()
            .ok_or_else(|| format!("绩效等级系数 {} 必须是数字", grade))?;
        if !(0.0..=2.0).contains(&value) {
            return Err(format!("绩效等级系数 {} 必须在 0-2 之间", grade));
        }
    }

    // 安全红线阈值
    if let Some(v) = config["safety"]["severity_track"].get("critical_threshold") {
        let value = v
            .as_f64()
            .ok_or_else(|| "安全红线阈值必须是数字".to_string())?;
        if !(1.0..=50.0).contains(&value) {
            return Err("安全红线阈值必须在 1-50 之间".to_string());
        }
    }

    // 培训失格次数
    let rules = &config["training"]["penalty_rules"];
    if let Some(v) = rules["absolute_threshold"].get("fail_count") {
        match v.as_i64() {
            Some(n) if (1..=10).contains(&n) => {}
            _ => return Err("失格次数阈值必须是 1-10 之间的整数".to_string()),
        }
    }

    for key in [
        "afr_thresholds",
        "afr_thresholds_new_employee",
        "afr_thresholds_experienced",
    ] {
        if let Some(items) = rules.get(key).and_then(Value::as_array) {
            for item in items {
                if let Some(t) = item.get("threshold") {
                    let value = t
                        .as_f64()
                        .ok_or_else(|| "AFR阈值必须是数字".to_string())?;
                    if !(0.0..=50.0).contains(&value) {
                        return Err("AFR阈值必须在 0-50 之间".to_string());
                    }
                }
            }
        }
    }

    // 综合权重
    if let Some(weights) = config["comprehensive"]["score_weights"].as_object() {
        let mut total = 0.0;
        for (name, w) in weights {
            total += w
                .as_f64()
                .ok_or_else(|| format!("权重 {} 必须是数字", name))?;
        }
        if (total - 1.0).abs() > 0.01 {
            return Err(format!("权重总和必须为1.0，当前为{:.2}", total));
        }
    }

    if let Some(v) = config["key_personnel"].get("comprehensive_threshold") {
        let value = v
            .as_f64()
            .ok_or_else(|| "重点人员综合分阈值必须是数字".to_string())?;
        if !(0.0..=100.0).contains(&value) {
            return Err("重点人员综合分阈值必须在 0-100 之间".to_string());
        }
    }

    // 学习能力恶化模式
    if let Some(learning) = config.get("learning_new") {
        if let Some(mode) = learning.get("deterioration_mode") {
            match mode.as_str() {
                Some("progressive") | Some("immediate") => {}
                _ => return Err("deterioration_mode 仅支持 progressive 或 immediate".to_string()),
            }
        }
        if let Some(v) = learning.get("factor_deterioration_mild") {
            match v.as_f64() {
                Some(x) if (0.0..=1.0).contains(&x) => {}
                _ => return Err("factor_deterioration_mild 必须在 0-1 之间".to_string()),
            }
        }
    }

    AlgorithmConfig::from_value(config).map_err(|e| format!("配置结构无效: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::presets;
    use serde_json::json;

    #[test]
    fn test_builtin_presets_pass() {
        for preset in presets::builtin_presets() {
            let (ok, msg) = validate_config(&preset.config);
            assert!(ok, "{}: {}", preset.key, msg);
            assert_eq!(msg, t("config.validated"));
        }
    }

    #[test]
    fn test_missing_section() {
        let mut cfg = presets::standard_config();
        cfg.as_object_mut().unwrap().remove("key_personnel");
        let (ok, msg) = validate_config(&cfg);
        assert!(!ok);
        assert!(msg.contains("key_personnel"));
    }

    #[test]
    fn test_weight_sum() {
        let mut cfg = presets::standard_config();
        cfg["comprehensive"]["score_weights"]["performance"] = json!(0.5);
        let (ok, msg) = validate_config(&cfg);
        assert!(!ok);
        assert!(msg.contains("权重总和"));
    }

    #[test]
    fn test_grade_coefficient_range() {
        let mut cfg = presets::standard_config();
        cfg["performance"]["grade_coefficients"]["A"] = json!(2.5);
        assert!(!validate_config(&cfg).0);
    }

    #[test]
    fn test_fail_count_must_be_integer() {
        let mut cfg = presets::standard_config();
        cfg["training"]["penalty_rules"]["absolute_threshold"]["fail_count"] = json!(2.5);
        assert!(!validate_config(&cfg).0);
    }

    #[test]
    fn test_deterioration_mode() {
        let mut cfg = presets::standard_config();
        cfg["learning_new"]["deterioration_mode"] = json!("sudden");
        assert!(!validate_config(&cfg).0);
        cfg["learning_new"]["deterioration_mode"] = json!("progressive");
        cfg["learning_new"]["factor_deterioration_mild"] = json!(0.5);
        assert!(validate_config(&cfg).0);
    }
}
