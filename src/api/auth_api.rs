// ==========================================
// 班组管理系统 - 认证与用户管理 API
// ==========================================
// 职责: 登录/登出/会话校验、修改密码、用户管理（仅管理员）
// ==========================================

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::session::SessionStore;
use crate::domain::types::UserRole;
use crate::domain::user::{AuthUser, NewUser, User, UserPatch};
use crate::engine::access::AccessScope;
use crate::i18n::{t, t_with_args};
use crate::repository::{DepartmentRepository, UserRepository};
use crate::security::{hash_password, verify_password};

/// 密码最小长度
pub const MIN_PASSWORD_LEN: usize = 6;

/// 登录结果
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AuthUser,
}

// ==========================================
// AuthApi - 认证与用户管理 API
// ==========================================
pub struct AuthApi {
    user_repo: Arc<UserRepository>,
    department_repo: Arc<DepartmentRepository>,
    sessions: Arc<SessionStore>,
}

impl AuthApi {
    pub fn new(
        user_repo: Arc<UserRepository>,
        department_repo: Arc<DepartmentRepository>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            user_repo,
            department_repo,
            sessions,
        }
    }

    /// 登录
    ///
    /// # 返回
    /// - Ok(LoginResponse): 会话 token 与当前用户
    /// - Err(ApiError::Unauthorized): 账号不存在或密码错误
    #[instrument(skip(self, password))]
    pub fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let user = self.user_repo.find_by_username(username.trim())?;
        let user = match user {
            Some(u) if verify_password(&u.password_hash, password) => u,
            _ => {
                warn!(username, "登录失败");
                return Err(ApiError::Unauthorized(t("auth.invalid_credentials")));
            }
        };

        let auth_user = self
            .user_repo
            .load_auth_user(user.id)?
            .ok_or_else(|| ApiError::Unauthorized(t("auth.invalid_credentials")))?;
        let token = self.sessions.create(user.id);
        info!(user_id = user.id, "登录成功");
        Ok(LoginResponse {
            token,
            user: auth_user,
        })
    }

    /// 校验 token 并加载会话用户
    pub fn authenticate(&self, token: Option<&str>) -> ApiResult<AuthUser> {
        let token = token.ok_or_else(|| ApiError::Unauthorized(t("auth.login_required")))?;
        let user_id = self
            .sessions
            .authenticate(token)
            .ok_or_else(|| ApiError::Unauthorized(t("auth.session_expired")))?;
        match self.user_repo.load_auth_user(user_id)? {
            Some(user) => Ok(user),
            None => {
                self.sessions.revoke(token);
                Err(ApiError::Unauthorized(t("auth.session_expired")))
            }
        }
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token)
    }

    /// 计算操作者的访问范围
    pub fn scope(&self, user: &AuthUser) -> ApiResult<AccessScope> {
        let departments = self.department_repo.list_all()?;
        Ok(AccessScope::resolve(user, &departments))
    }

    /// 修改本人密码
    #[instrument(skip(self, old_password, new_password), fields(user_id = user.id))]
    pub fn change_password(&self, user: &AuthUser, old_password: &str, new_password: &str) -> ApiResult<()> {
        let stored = self
            .user_repo
            .find_by_id(user.id)?
            .ok_or_else(|| ApiError::not_found("User", user.id))?;
        if !verify_password(&stored.password_hash, old_password) {
            return Err(ApiError::InvalidInput(t("auth.old_password_mismatch")));
        }
        validate_new_password(new_password)?;
        if old_password == new_password {
            return Err(ApiError::InvalidInput(t("auth.password_unchanged")));
        }
        let hash = hash_password(new_password)?;
        self.user_repo.update_password(user.id, &hash)?;
        info!("密码已修改");
        Ok(())
    }

    // ==========================================
    // 用户管理（仅管理员）
    // ==========================================

    pub fn list_users(&self, operator: &AuthUser) -> ApiResult<Vec<User>> {
        self.scope(operator)?.ensure_admin()?;
        Ok(self.user_repo.list()?)
    }

    #[instrument(skip(self, operator, input), fields(username = %input.username))]
    pub fn create_user(&self, operator: &AuthUser, input: NewUser) -> ApiResult<User> {
        self.scope(operator)?.ensure_admin()?;
        let username = input.username.trim();
        if username.is_empty() {
            return Err(invalid("用户名不能为空"));
        }
        validate_new_password(&input.password)?;
        let role = parse_role(&input.role)?;
        self.ensure_department_exists(input.department_id)?;
        if self.user_repo.find_by_username(username)?.is_some() {
            return Err(ApiError::Conflict(format!("用户名已存在: {}", username)));
        }

        let hash = hash_password(&input.password)?;
        let id = self.user_repo.create(
            username,
            &hash,
            input.display_name.as_deref(),
            role,
            input.department_id,
        )?;
        info!(user_id = id, role = %role, "用户已创建");
        self.user_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("User", id))
    }

    pub fn update_user(&self, operator: &AuthUser, id: i64, patch: UserPatch) -> ApiResult<User> {
        self.scope(operator)?.ensure_admin()?;
        let existing = self
            .user_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("User", id))?;
        let role = match patch.role.as_deref() {
            Some(raw) => parse_role(raw)?,
            None => existing.role,
        };
        let department_id = patch.department_id.or(existing.department_id);
        self.ensure_department_exists(department_id)?;
        let display_name = patch.display_name.or(existing.display_name);

        self.user_repo
            .update(id, role, department_id, display_name.as_deref())?;
        self.user_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("User", id))
    }

    /// 管理员重置密码，同时清除该用户的会话
    pub fn reset_password(&self, operator: &AuthUser, id: i64, new_password: &str) -> ApiResult<()> {
        self.scope(operator)?.ensure_admin()?;
        validate_new_password(new_password)?;
        let hash = hash_password(new_password)?;
        self.user_repo.update_password(id, &hash)?;
        self.sessions.revoke_user(id);
        info!(user_id = id, "密码已重置");
        Ok(())
    }

    pub fn delete_user(&self, operator: &AuthUser, id: i64) -> ApiResult<()> {
        self.scope(operator)?.ensure_admin()?;
        if operator.id == id {
            return Err(ApiError::BusinessRuleViolation(t("auth.cannot_delete_self")));
        }
        self.user_repo.delete(id)?;
        self.sessions.revoke_user(id);
        info!(user_id = id, "用户已删除");
        Ok(())
    }

    fn ensure_department_exists(&self, department_id: Option<i64>) -> ApiResult<()> {
        if let Some(id) = department_id {
            if self.department_repo.find_by_id(id)?.is_none() {
                return Err(ApiError::not_found("Department", id));
            }
        }
        Ok(())
    }
}

fn invalid(detail: &str) -> ApiError {
    ApiError::InvalidInput(t_with_args("common.invalid_input", &[("detail", detail)]))
}

fn parse_role(raw: &str) -> ApiResult<UserRole> {
    UserRole::from_str(raw).ok_or_else(|| invalid(&format!("未知角色: {}", raw)))
}

fn validate_new_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::InvalidInput(t("auth.password_too_short")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::setup_conn;

    fn api() -> AuthApi {
        let conn = setup_conn();
        AuthApi::new(
            Arc::new(UserRepository::from_connection(conn.clone())),
            Arc::new(DepartmentRepository::from_connection(conn)),
            Arc::new(SessionStore::new(3600)),
        )
    }

    #[test]
    fn test_login_and_authenticate() {
        let api = api();
        assert!(matches!(
            api.login("admin", "wrong"),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            api.login("nobody", "admin123"),
            Err(ApiError::Unauthorized(_))
        ));

        let login = api.login("admin", "admin123").unwrap();
        assert!(login.user.is_admin());
        assert_eq!(login.user.department_path.as_deref(), Some("/1"));

        let user = api.authenticate(Some(&login.token)).unwrap();
        assert_eq!(user.username, "admin");
        assert!(api.logout(&login.token));
        assert!(matches!(
            api.authenticate(Some(&login.token)),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(api.authenticate(None), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_change_password_rules() {
        let api = api();
        let admin = api.login("admin", "admin123").unwrap().user;
        assert!(matches!(
            api.change_password(&admin, "bad-old", "newpass1"),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            api.change_password(&admin, "admin123", "123"),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            api.change_password(&admin, "admin123", "admin123"),
            Err(ApiError::InvalidInput(_))
        ));
        api.change_password(&admin, "admin123", "newpass1").unwrap();
        assert!(api.login("admin", "newpass1").is_ok());
    }

    #[test]
    fn test_user_admin_guards() {
        let api = api();
        let admin = api.login("admin", "admin123").unwrap().user;
        let created = api
            .create_user(
                &admin,
                NewUser {
                    username: "zhang".to_string(),
                    password: "secret1".to_string(),
                    display_name: Some("张班长".to_string()),
                    role: "manager".to_string(),
                    department_id: Some(1),
                },
            )
            .unwrap();
        assert_eq!(created.role, UserRole::Manager);

        let duplicate = api.create_user(
            &admin,
            NewUser {
                username: "zhang".to_string(),
                password: "secret1".to_string(),
                display_name: None,
                role: "user".to_string(),
                department_id: None,
            },
        );
        assert!(matches!(duplicate, Err(ApiError::Conflict(_))));

        let bad_role = api.create_user(
            &admin,
            NewUser {
                username: "li".to_string(),
                password: "secret1".to_string(),
                display_name: None,
                role: "root".to_string(),
                department_id: None,
            },
        );
        assert!(matches!(bad_role, Err(ApiError::InvalidInput(_))));

        let manager = api.login("zhang", "secret1").unwrap().user;
        assert!(matches!(api.list_users(&manager), Err(ApiError::PermissionDenied(_))));

        let updated = api
            .update_user(
                &admin,
                created.id,
                UserPatch {
                    role: Some("user".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.role, UserRole::User);
        assert_eq!(updated.display_name.as_deref(), Some("张班长"));

        assert!(matches!(
            api.delete_user(&admin, admin.id),
            Err(ApiError::BusinessRuleViolation(_))
        ));
        api.delete_user(&admin, created.id).unwrap();
        assert_eq!(api.list_users(&admin).unwrap().len(), 1);
    }
}
