// ==========================================
// 算法配置集成测试
// ==========================================
// 测试范围:
// 1. 预设应用 / 自定义保存 / 变更原因必填
// 2. 预设更新同步当前配置与回滚
// 3. 变更日志与差异
// ==========================================

mod helpers;

use helpers::ApiTestEnv;
use serde_json::json;
use team_management::domain::types::ConfigAction;
use team_management::engine::simulate::SimulationSample;
use team_management::ApiError;

#[test]
fn test_initial_state_标准预设() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let info = env.state.config_api.get_current_info().unwrap();
    assert_eq!(info.based_on_preset.as_deref(), Some("standard"));
    assert!(!info.is_customized);

    let logs = env.state.config_api.get_logs(&env.admin, None, None).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, ConfigAction::Init);
}

#[test]
fn test_apply_preset_and_custom_update() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let api = &env.state.config_api;

    assert!(matches!(
        api.apply_preset(&env.admin, "strict", "   ").unwrap_err(),
        ApiError::InvalidInput(_)
    ));
    assert!(matches!(
        api.apply_preset(&env.admin, "unknown", "试用").unwrap_err(),
        ApiError::NotFound(_)
    ));

    api.apply_preset(&env.admin, "strict", "收紧考核").unwrap();
    let info = api.get_current_info().unwrap();
    assert_eq!(info.based_on_preset.as_deref(), Some("strict"));
    assert_eq!(info.updated_by_name.as_deref(), Some("admin"));

    let mut config = api.get_active_config().unwrap();
    config["comprehensive"]["score_weights"]["performance"] = json!(0.5);
    // 权重总和不为 1
    assert!(matches!(
        api.update_custom_config(&env.admin, &config, "调整权重").unwrap_err(),
        ApiError::ValidationError(_)
    ));

    let mut config = api.get_active_config().unwrap();
    config["safety"]["severity_track"]["critical_threshold"] = json!(15);
    let log_id = api.update_custom_config(&env.admin, &config, "放宽红线").unwrap();
    let info = api.get_current_info().unwrap();
    assert!(info.is_customized);
    assert!(info.based_on_preset.is_none());

    let detail = api.get_log_detail(&env.admin, log_id).unwrap();
    assert_eq!(detail.log.action, ConfigAction::CustomUpdate);
    assert_eq!(detail.log.change_reason.as_deref(), Some("放宽红线"));
}

#[test]
fn test_update_preset_syncs_and_rolls_back() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let api = &env.state.config_api;

    let original = api.get_active_config().unwrap();
    let mut changed = original.clone();
    changed["key_personnel"]["comprehensive_threshold"] = json!(72);

    let log_id = api
        .update_preset(&env.admin, "standard", &changed, "调整重点人员阈值")
        .unwrap();
    // 当前配置基于 standard 且未自定义，同步生效
    assert_eq!(
        api.get_active_config().unwrap()["key_personnel"]["comprehensive_threshold"],
        json!(72)
    );
    let entry = api.get_log_detail(&env.admin, log_id).unwrap();
    assert_eq!(entry.log.preset_name.as_deref(), Some("standard"));

    api.rollback_preset_update(&env.admin, log_id, "回滚").unwrap();
    assert_eq!(api.get_active_config().unwrap(), original);
    let logs = api.get_logs(&env.admin, Some(10), None).unwrap();
    assert_eq!(logs[0].action, ConfigAction::RollbackPreset);

    // 仅预设更新日志可回滚
    let init_id = logs.iter().find(|l| l.action == ConfigAction::Init).unwrap().id;
    assert!(matches!(
        api.rollback_preset_update(&env.admin, init_id, "回滚").unwrap_err(),
        ApiError::BusinessRuleViolation(_)
    ));
}

#[test]
fn test_update_other_preset_does_not_touch_active() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let api = &env.state.config_api;
    let before = api.get_active_config().unwrap();

    let lenient = api
        .get_presets()
        .unwrap()
        .into_iter()
        .find(|p| p.preset_key == "lenient")
        .unwrap();
    let mut changed = lenient.config_data.clone();
    changed["key_personnel"]["comprehensive_threshold"] = json!(50);
    api.update_preset(&env.admin, "lenient", &changed, "宽松档调整").unwrap();

    assert_eq!(api.get_active_config().unwrap(), before);
}

#[test]
fn test_validate_and_simulate_open_to_all() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let api = &env.state.config_api;

    let outcome = api.validate(&json!({"performance": {}}));
    assert!(!outcome.valid);
    assert!(!outcome.message.is_empty());

    let active = api.get_active_config().unwrap();
    assert!(api.validate(&active).valid);

    // 缺省配置试算与显式传入当前配置一致
    let sample = SimulationSample::default();
    let a = serde_json::to_value(api.simulate(None, &sample).unwrap()).unwrap();
    let b = serde_json::to_value(api.simulate(Some(&active), &sample).unwrap()).unwrap();
    assert_eq!(a, b);
}
