// ==========================================
// 班组管理系统 - 人员档案领域模型
// ==========================================
// 对齐: employees 表
// 主键: emp_no（工号）
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Employee - 人员档案
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Option<i64>,
    pub emp_no: String,
    pub name: String,
    pub department_id: Option<i64>,
    pub class_name: Option<String>,
    pub position: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub certification_date: Option<NaiveDate>,
    pub solo_driving_date: Option<NaiveDate>,
    pub marital_status: Option<String>,
    pub hometown: Option<String>,
    pub political_status: Option<String>,
    pub education: Option<String>,
    pub graduation_school: Option<String>,
    pub work_start_date: Option<NaiveDate>,
    pub entry_date: Option<NaiveDate>,
    pub specialty: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

/// 人员列表视图（附部门名与派生字段）
#[derive(Debug, Clone, Serialize)]
pub struct PersonnelView {
    #[serde(flatten)]
    pub employee: Employee,
    pub department_name: Option<String>,
    pub age: Option<i32>,
    pub working_years: Option<f64>,
    pub tenure_years: Option<f64>,
    pub certification_years: Option<f64>,
    pub solo_driving_years: Option<f64>,
}

/// 新增/更新人员请求（日期为原始字符串，入库前归一化）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeInput {
    pub emp_no: String,
    pub name: String,
    pub department_id: Option<i64>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub certification_date: Option<String>,
    #[serde(default)]
    pub solo_driving_date: Option<String>,
    #[serde(default)]
    pub marital_status: Option<String>,
    #[serde(default)]
    pub hometown: Option<String>,
    #[serde(default)]
    pub political_status: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub graduation_school: Option<String>,
    #[serde(default)]
    pub work_start_date: Option<String>,
    #[serde(default)]
    pub entry_date: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
}

// ==========================================
// PersonnelField - 可单独修改的字段白名单
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonnelField {
    Name,
    DepartmentId,
    ClassName,
    Position,
    BirthDate,
    CertificationDate,
    SoloDrivingDate,
    MaritalStatus,
    Hometown,
    PoliticalStatus,
    Education,
    GraduationSchool,
    WorkStartDate,
    EntryDate,
    Specialty,
}

impl PersonnelField {
    /// 从请求字段名解析，不在白名单中返回 None
    pub fn from_str(s: &str) -> Option<Self> {
        let field = match s {
            "name" => PersonnelField::Name,
            "department_id" => PersonnelField::DepartmentId,
            "class_name" => PersonnelField::ClassName,
            "position" => PersonnelField::Position,
            "birth_date" => PersonnelField::BirthDate,
            "certification_date" => PersonnelField::CertificationDate,
            "solo_driving_date" => PersonnelField::SoloDrivingDate,
            "marital_status" => PersonnelField::MaritalStatus,
            "hometown" => PersonnelField::Hometown,
            "political_status" => PersonnelField::PoliticalStatus,
            "education" => PersonnelField::Education,
            "graduation_school" => PersonnelField::GraduationSchool,
            "work_start_date" => PersonnelField::WorkStartDate,
            "entry_date" => PersonnelField::EntryDate,
            "specialty" => PersonnelField::Specialty,
            _ => return None,
        };
        Some(field)
    }

    pub fn column(&self) -> &'static str {
        match self {
            PersonnelField::Name => "name",
            PersonnelField::DepartmentId => "department_id",
            PersonnelField::ClassName => "class_name",
            PersonnelField::Position => "position",
            PersonnelField::BirthDate => "birth_date",
            PersonnelField::CertificationDate => "certification_date",
            PersonnelField::SoloDrivingDate => "solo_driving_date",
            PersonnelField::MaritalStatus => "marital_status",
            PersonnelField::Hometown => "hometown",
            PersonnelField::PoliticalStatus => "political_status",
            PersonnelField::Education => "education",
            PersonnelField::GraduationSchool => "graduation_school",
            PersonnelField::WorkStartDate => "work_start_date",
            PersonnelField::EntryDate => "entry_date",
            PersonnelField::Specialty => "specialty",
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(
            self,
            PersonnelField::BirthDate
                | PersonnelField::CertificationDate
                | PersonnelField::SoloDrivingDate
                | PersonnelField::WorkStartDate
                | PersonnelField::EntryDate
        )
    }
}

/// 人员列表过滤条件
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonnelFilter {
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub keyword: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_whitelist() {
        assert_eq!(
            PersonnelField::from_str("birth_date").map(|f| f.column()),
            Some("birth_date")
        );
        assert!(PersonnelField::from_str("emp_no").is_none());
        assert!(PersonnelField::from_str("id; DROP TABLE employees").is_none());
        assert!(PersonnelField::EntryDate.is_date());
        assert!(!PersonnelField::Education.is_date());
    }
}
