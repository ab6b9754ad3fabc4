// ==========================================
// 班组管理系统 - 用户数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（密码哈希/权限判断在 API 层）
// ==========================================

use crate::domain::types::UserRole;
use crate::domain::user::{AuthUser, User};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const USER_COLUMNS: &str = r#"
    u.id, u.username, u.password_hash, u.display_name, u.department_id,
    d.name, u.role, u.created_at
"#;

/// 用户仓储
pub struct UserRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UserRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按用户名查询
    pub fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM users u LEFT JOIN departments d ON d.id = u.department_id WHERE u.username = ?1",
            USER_COLUMNS
        );
        let user = conn
            .query_row(&sql, params![username], map_user)
            .optional()?;
        Ok(user)
    }

    /// 按主键查询
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM users u LEFT JOIN departments d ON d.id = u.department_id WHERE u.id = ?1",
            USER_COLUMNS
        );
        let user = conn.query_row(&sql, params![id], map_user).optional()?;
        Ok(user)
    }

    /// 全部用户（按 id）
    pub fn list(&self) -> RepositoryResult<Vec<User>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM users u LEFT JOIN departments d ON d.id = u.department_id ORDER BY u.id",
            USER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map([], map_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// 加载会话用户（含部门路径）
    pub fn load_auth_user(&self, id: i64) -> RepositoryResult<Option<AuthUser>> {
        let conn = self.get_conn()?;
        let user = conn
            .query_row(
                r#"
                SELECT u.id, u.username, u.display_name, u.role,
                       u.department_id, d.name, d.path
                FROM users u
                LEFT JOIN departments d ON d.id = u.department_id
                WHERE u.id = ?1
                "#,
                params![id],
                |row| {
                    Ok(AuthUser {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        display_name: row.get(2)?,
                        role: parse_role(&row.get::<_, String>(3)?),
                        department_id: row.get(4)?,
                        department_name: row.get(5)?,
                        department_path: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// 新建用户，返回新 id
    pub fn create(
        &self,
        username: &str,
        password_hash: &str,
        display_name: Option<&str>,
        role: UserRole,
        department_id: Option<i64>,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO users (username, password_hash, display_name, department_id, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                username,
                password_hash,
                display_name,
                department_id,
                role.to_db_str(),
                chrono::Local::now().naive_local()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 更新角色/部门/显示名
    pub fn update(
        &self,
        id: i64,
        role: UserRole,
        department_id: Option<i64>,
        display_name: Option<&str>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE users SET role = ?1, department_id = ?2, display_name = ?3 WHERE id = ?4",
            params![role.to_db_str(), department_id, display_name, id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("User", id));
        }
        Ok(())
    }

    pub fn update_password(&self, id: i64, password_hash: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![password_hash, id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("User", id));
        }
        Ok(())
    }

    pub fn delete(&self, id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(RepositoryError::not_found("User", id));
        }
        Ok(())
    }

    /// 部门下用户数
    pub fn count_by_department(&self, department_id: i64) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(1) FROM users WHERE department_id = ?1",
            params![department_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn parse_role(s: &str) -> UserRole {
    UserRole::from_str(s).unwrap_or(UserRole::User)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        display_name: row.get(3)?,
        department_id: row.get(4)?,
        department_name: row.get(5)?,
        role: parse_role(&row.get::<_, String>(6)?),
        created_at: row.get(7).ok(),
    })
}
