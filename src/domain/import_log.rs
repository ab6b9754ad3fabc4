// ==========================================
// 班组管理系统 - 导入日志领域模型
// ==========================================
// 对齐: import_logs 表
// ==========================================

use crate::domain::types::ImportModule;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 导入日志
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportLog {
    pub id: i64,
    pub module: String,
    pub operation: String,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub user_role: Option<String>,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub file_name: Option<String>,
    pub total_rows: i64,
    pub success_rows: i64,
    pub failed_rows: i64,
    pub skipped_rows: i64,
    pub error_message: Option<String>,
    pub import_details: Option<Value>,
    pub created_at: NaiveDateTime,
}

/// 待写入的导入日志
#[derive(Debug, Clone)]
pub struct NewImportLog {
    pub module: ImportModule,
    pub operation: String,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub user_role: Option<String>,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub file_name: Option<String>,
    pub total_rows: i64,
    pub success_rows: i64,
    pub failed_rows: i64,
    pub skipped_rows: i64,
    pub error_message: Option<String>,
    pub import_details: Option<Value>,
}

/// 导入日志过滤条件
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportLogFilter {
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}
