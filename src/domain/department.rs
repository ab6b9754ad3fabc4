// ==========================================
// 班组管理系统 - 部门领域模型
// ==========================================
// 对齐: departments 表
// 层级: path 形如 "/1/3/7"，level 从 1 开始
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Department - 部门
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub description: Option<String>,
    pub manager_user_id: Option<i64>,
    pub level: i64,
    pub path: String,
    pub created_at: Option<NaiveDateTime>,
}

impl Department {
    /// 子部门路径前缀
    pub fn subtree_prefix(&self) -> String {
        format!("{}/", self.path)
    }

    /// other 是否位于本部门子树（含自身）
    pub fn contains(&self, other: &Department) -> bool {
        other.id == self.id || other.path.starts_with(&self.subtree_prefix())
    }
}

/// 部门列表项（附人数）
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentSummary {
    #[serde(flatten)]
    pub department: Department,
    pub employee_count: i64,
}

/// 部门树节点
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentNode {
    #[serde(flatten)]
    pub department: Department,
    pub employee_count: i64,
    pub children: Vec<DepartmentNode>,
}

/// 新建部门请求
#[derive(Debug, Clone, Deserialize)]
pub struct NewDepartment {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub manager_user_id: Option<i64>,
}

/// 部门更新请求
///
/// parent_id: 字段缺省为不变，`null` 为移到顶层，数值为移到该部门下
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub parent_id: Option<Option<i64>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub manager_user_id: Option<i64>,
}

/// 区分字段缺省（外层 None）与显式 null（Some(None)）
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
