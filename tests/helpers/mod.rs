// ==========================================
// 集成测试辅助工具
// ==========================================
// 职责: 基于临时数据库组装完整 AppState，并提供部门/用户/人员的准备函数
// ==========================================

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;

use team_management::domain::department::{Department, NewDepartment};
use team_management::domain::employee::EmployeeInput;
use team_management::domain::user::{AuthUser, NewUser};
use team_management::{AppSettings, AppState};

pub const TEST_PASSWORD: &str = "secret123";

/// API测试环境
///
/// 持有临时目录以保证数据库文件的生命周期
pub struct ApiTestEnv {
    pub state: Arc<AppState>,
    pub admin: AuthUser,
    pub admin_token: String,
    _dir: TempDir,
}

impl ApiTestEnv {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("team.db");
        let settings = AppSettings::for_paths(db_path.to_string_lossy().to_string(), dir.path());
        let state = AppState::new(settings)?;
        let login = state.auth_api.login("admin", "admin123")?;
        Ok(Self {
            state: Arc::new(state),
            admin: login.user,
            admin_token: login.token,
            _dir: dir,
        })
    }

    /// 创建部门（parent 缺省挂在根部门下）
    pub fn create_department(&self, name: &str, parent_id: Option<i64>) -> Department {
        self.state
            .department_api
            .create_department(
                &self.admin,
                NewDepartment {
                    name: name.to_string(),
                    parent_id: Some(parent_id.unwrap_or(1)),
                    description: None,
                    manager_user_id: None,
                },
            )
            .expect("创建部门失败")
    }

    /// 创建账号并登录，返回会话用户
    pub fn login_as(&self, username: &str, role: &str, department_id: i64) -> AuthUser {
        self.login_with_token(username, role, department_id).0
    }

    pub fn login_with_token(&self, username: &str, role: &str, department_id: i64) -> (AuthUser, String) {
        self.state
            .auth_api
            .create_user(
                &self.admin,
                NewUser {
                    username: username.to_string(),
                    password: TEST_PASSWORD.to_string(),
                    display_name: None,
                    role: role.to_string(),
                    department_id: Some(department_id),
                },
            )
            .expect("创建用户失败");
        let login = self
            .state
            .auth_api
            .login(username, TEST_PASSWORD)
            .expect("登录失败");
        (login.user, login.token)
    }

    pub fn add_employee(&self, emp_no: &str, name: &str, department_id: i64) {
        self.state
            .personnel_api
            .upsert_personnel(
                &self.admin,
                EmployeeInput {
                    emp_no: emp_no.to_string(),
                    name: name.to_string(),
                    department_id: Some(department_id),
                    entry_date: Some("2018-03-01".to_string()),
                    ..Default::default()
                },
            )
            .expect("新增人员失败");
    }
}
