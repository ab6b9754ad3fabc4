// ==========================================
// 班组管理系统 - 绩效领域模型
// ==========================================
// 对齐: performance_records / quarter_overrides /
//       quarter_grade_options / grade_map 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// PerformanceRecord - 月度绩效
// ==========================================
// 唯一键: (emp_no, year, month)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub id: i64,
    pub emp_no: String,
    pub name: String,
    pub year: i32,
    pub month: u32,
    pub score: Option<f64>,
    pub grade: Option<String>,
    pub src_file: Option<String>,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

/// 新增/更新月度绩效请求
#[derive(Debug, Clone, Deserialize)]
pub struct PerformanceInput {
    pub emp_no: String,
    #[serde(default)]
    pub name: Option<String>,
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub grade: Option<String>,
}

/// 绩效列表过滤条件
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerformanceFilter {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub emp_no: Option<String>,
    #[serde(default)]
    pub department_id: Option<i64>,
}

// ==========================================
// 季度等级
// ==========================================

/// 季度等级选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeOption {
    pub grade: String,
    pub display_order: i64,
    pub is_default: bool,
    pub color: Option<String>,
}

/// 季度等级人工调整
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterOverride {
    pub emp_no: String,
    pub year: i32,
    pub quarter: u32,
    pub grade: String,
    pub updated_by: Option<i64>,
    pub updated_at: Option<NaiveDateTime>,
}

/// 季度内单月等级
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthGrade {
    pub month: u32,
    pub grade: Option<String>,
    pub score: Option<f64>,
}

/// 季度等级行
#[derive(Debug, Clone, Serialize)]
pub struct QuarterGradeRow {
    pub emp_no: String,
    pub name: String,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub monthly: Vec<MonthGrade>,
    pub computed_score: Option<f64>,
    pub computed_grade: Option<String>,
    pub override_grade: Option<String>,
    pub final_grade: Option<String>,
    pub is_overridden: bool,
}

/// 年月合法性: 年份 2000..=2100，月份 1..=12
pub fn validate_period(year: i32, month: u32) -> Result<(), String> {
    if !(2000..=2100).contains(&year) {
        return Err(format!("年份超出范围: {}", year));
    }
    if !(1..=12).contains(&month) {
        return Err(format!("月份超出范围: {}", month));
    }
    Ok(())
}

/// 按等级选项匹配（忽略大小写与空白），返回选项中的标准写法
pub fn match_grade_option(raw: &str, options: &[GradeOption]) -> Option<String> {
    let wanted = raw.trim().to_uppercase();
    if wanted.is_empty() {
        return None;
    }
    options
        .iter()
        .find(|o| o.grade.to_uppercase() == wanted)
        .map(|o| o.grade.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(grade: &str) -> GradeOption {
        GradeOption {
            grade: grade.to_string(),
            display_order: 0,
            is_default: false,
            color: None,
        }
    }

    #[test]
    fn test_validate_period() {
        assert!(validate_period(2024, 1).is_ok());
        assert!(validate_period(1999, 5).is_err());
        assert!(validate_period(2024, 13).is_err());
        assert!(validate_period(2024, 0).is_err());
    }

    #[test]
    fn test_match_grade_option() {
        let options = vec![option("A"), option("B+"), option("B")];
        assert_eq!(match_grade_option(" b+ ", &options).as_deref(), Some("B+"));
        assert_eq!(match_grade_option("b", &options).as_deref(), Some("B"));
        assert_eq!(match_grade_option("E", &options), None);
        assert_eq!(match_grade_option("", &options), None);
    }
}
