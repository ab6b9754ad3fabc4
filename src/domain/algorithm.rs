// ==========================================
// 班组管理系统 - 算法配置领域模型
// ==========================================
// 对齐: algorithm_presets / algorithm_active_config /
//       algorithm_config_logs 表
// ==========================================

use crate::domain::types::ConfigAction;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 预设方案
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmPreset {
    pub id: i64,
    pub preset_name: String,
    pub preset_key: String,
    pub description: Option<String>,
    pub config_data: Value,
    pub updated_at: Option<NaiveDateTime>,
}

/// 当前生效配置（单行 id=1）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveConfig {
    pub based_on_preset: Option<String>,
    pub is_customized: bool,
    pub config_data: Value,
    pub updated_by: Option<i64>,
    pub updated_at: NaiveDateTime,
}

/// 当前配置概要
#[derive(Debug, Clone, Serialize)]
pub struct ActiveConfigInfo {
    pub based_on_preset: Option<String>,
    pub preset_name: Option<String>,
    pub is_customized: bool,
    pub updated_by: Option<i64>,
    pub updated_by_name: Option<String>,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// ConfigChangeLog - 配置变更日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigChangeLog {
    pub id: i64,
    pub action: ConfigAction,
    pub preset_name: Option<String>,
    pub old_config: Option<Value>,
    pub new_config: Option<Value>,
    pub change_reason: Option<String>,
    pub changed_by: Option<i64>,
    pub changed_by_name: Option<String>,
    pub changed_at: NaiveDateTime,
}

/// 待写入的变更日志
#[derive(Debug, Clone)]
pub struct NewConfigLog<'a> {
    pub action: ConfigAction,
    pub preset_name: Option<&'a str>,
    pub old_config: Option<&'a Value>,
    pub new_config: Option<&'a Value>,
    pub change_reason: &'a str,
    pub changed_by: Option<i64>,
    pub changed_by_name: &'a str,
}

/// 配置差异项
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigDiff {
    pub path: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// 日志详情（含差异）
#[derive(Debug, Clone, Serialize)]
pub struct ConfigLogDetail {
    #[serde(flatten)]
    pub log: ConfigChangeLog,
    pub diff: Vec<ConfigDiff>,
}
