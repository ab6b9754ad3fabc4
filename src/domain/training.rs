// ==========================================
// 班组管理系统 - 培训领域模型
// ==========================================
// 对齐: training_project_categories / training_projects /
//       training_records 表
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// 培训项目分类
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingCategory {
    pub id: i64,
    pub name: String,
    pub project_count: i64,
}

/// 培训项目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingProject {
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
}

// ==========================================
// TrainingRecord - 培训记录
// ==========================================
// 项目名/分类名在写入时快照，项目改名不影响历史记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub id: i64,
    pub emp_no: String,
    pub name: String,
    pub team_name: Option<String>,
    pub training_date: NaiveDate,
    pub project_id: Option<i64>,
    pub project_name: Option<String>,
    pub category_name: Option<String>,
    pub problem_type: Option<String>,
    pub specific_problem: Option<String>,
    pub corrective_measures: Option<String>,
    pub time_spent: Option<f64>,
    pub score: Option<f64>,
    pub assessor: Option<String>,
    pub remarks: Option<String>,
    pub is_qualified: bool,
    pub is_disqualified: bool,
    pub is_retake: bool,
    pub retake_of_record_id: Option<i64>,
    pub source_file: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl TrainingRecord {
    /// 失格判定: 标记失格 / 0 分 / 不合格
    pub fn is_failed(&self) -> bool {
        self.is_disqualified || self.score == Some(0.0) || !self.is_qualified
    }
}

/// 新增培训记录请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainingInput {
    pub emp_no: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    pub training_date: String,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub problem_type: Option<String>,
    #[serde(default)]
    pub specific_problem: Option<String>,
    #[serde(default)]
    pub corrective_measures: Option<String>,
    #[serde(default)]
    pub time_spent: Option<f64>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub assessor: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default = "default_true")]
    pub is_qualified: bool,
    #[serde(default)]
    pub is_disqualified: bool,
}

fn default_true() -> bool {
    true
}

/// 待写入的培训记录（已解析项目与快照）
#[derive(Debug, Clone)]
pub struct NewTrainingRecord {
    pub emp_no: String,
    pub name: String,
    pub team_name: Option<String>,
    pub training_date: NaiveDate,
    pub project_id: Option<i64>,
    pub project_name: Option<String>,
    pub category_name: Option<String>,
    pub problem_type: Option<String>,
    pub specific_problem: Option<String>,
    pub corrective_measures: Option<String>,
    pub time_spent: Option<f64>,
    pub score: Option<f64>,
    pub assessor: Option<String>,
    pub remarks: Option<String>,
    pub is_qualified: bool,
    pub is_disqualified: bool,
    pub is_retake: bool,
    pub retake_of_record_id: Option<i64>,
    pub source_file: Option<String>,
}

/// 培训记录过滤条件
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainingFilter {
    #[serde(default)]
    pub emp_no: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub only_failed: bool,
}

/// 单项目统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectCount {
    pub project_name: String,
    pub total: i64,
    pub failed: i64,
}

/// 培训统计
#[derive(Debug, Clone, Serialize)]
pub struct TrainingStats {
    pub total: i64,
    pub failed: i64,
    pub pass_rate: f64,
    pub by_project: Vec<ProjectCount>,
}
