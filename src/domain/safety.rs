// ==========================================
// 班组管理系统 - 安全检查领域模型
// ==========================================
// 对齐: safety_inspection_records 表
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// SafetyRecord - 安全检查记录
// ==========================================
// assessment 为自由文本（如 "扣3分"），扣分值在统计时提取
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyRecord {
    pub id: i64,
    pub category: Option<String>,
    pub inspection_date: NaiveDate,
    pub location: Option<String>,
    pub hazard_description: Option<String>,
    pub corrective_measures: Option<String>,
    pub deadline_date: Option<NaiveDate>,
    pub inspected_person: Option<String>,
    pub responsible_team: Option<String>,
    pub assessment: Option<String>,
    pub rectification_status: Option<String>,
    pub rectifier: Option<String>,
    pub work_type: Option<String>,
    pub responsibility_location: Option<String>,
    pub inspection_item: Option<String>,
    pub source_file: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

/// 新增/更新安全检查记录请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SafetyInput {
    #[serde(default)]
    pub category: Option<String>,
    pub inspection_date: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub hazard_description: Option<String>,
    #[serde(default)]
    pub corrective_measures: Option<String>,
    #[serde(default)]
    pub deadline_date: Option<String>,
    #[serde(default)]
    pub inspected_person: Option<String>,
    #[serde(default)]
    pub responsible_team: Option<String>,
    #[serde(default)]
    pub assessment: Option<String>,
    #[serde(default)]
    pub rectification_status: Option<String>,
    #[serde(default)]
    pub rectifier: Option<String>,
    #[serde(default)]
    pub work_type: Option<String>,
    #[serde(default)]
    pub responsibility_location: Option<String>,
    #[serde(default)]
    pub inspection_item: Option<String>,
}

/// 已校验的安全检查记录（待写入）
#[derive(Debug, Clone)]
pub struct NewSafetyRecord {
    pub category: Option<String>,
    pub inspection_date: NaiveDate,
    pub location: Option<String>,
    pub hazard_description: Option<String>,
    pub corrective_measures: Option<String>,
    pub deadline_date: Option<NaiveDate>,
    pub inspected_person: Option<String>,
    pub responsible_team: Option<String>,
    pub assessment: Option<String>,
    pub rectification_status: Option<String>,
    pub rectifier: Option<String>,
    pub work_type: Option<String>,
    pub responsibility_location: Option<String>,
    pub inspection_item: Option<String>,
    pub source_file: Option<String>,
}

/// 安全检查过滤条件
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SafetyFilter {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub inspected_person: Option<String>,
    #[serde(default)]
    pub responsible_team: Option<String>,
    #[serde(default)]
    pub rectification_status: Option<String>,
}

/// 被检查人排行项
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonCount {
    pub name: String,
    pub count: i64,
    pub total_deduction: f64,
}

/// 月度计数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCount {
    pub month: String,
    pub count: i64,
}

/// 安全检查统计
#[derive(Debug, Clone, Serialize)]
pub struct SafetyStats {
    pub total: i64,
    pub total_deduction: f64,
    pub by_month: Vec<MonthCount>,
    pub top_persons: Vec<PersonCount>,
}
