// ==========================================
// 班组管理系统 - 用户领域模型
// ==========================================
// 对齐: users 表
// ==========================================

use crate::domain::types::UserRole;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// User - 系统用户
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub role: UserRole,
    pub created_at: Option<NaiveDateTime>,
}

// ==========================================
// AuthUser - 已登录用户（会话上下文）
// ==========================================
// 权限判断只依赖此结构，不回查 users 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub department_path: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// 新建用户请求
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub role: String,
    #[serde(default)]
    pub department_id: Option<i64>,
}

/// 用户更新请求（角色/部门）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub display_name: Option<String>,
}
