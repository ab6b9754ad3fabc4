// ==========================================
// 班组管理系统 - 导入日志数据仓储
// ==========================================
// 表: import_logs
// ==========================================

use crate::domain::import_log::{ImportLog, NewImportLog};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use std::sync::{Arc, Mutex};

/// 导入日志仓储
pub struct ImportLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportLogRepository {
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

    pub fn insert(&self, log: &NewImportLog) -> RepositoryResult<i64> {
        let details = log
            .import_details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_logs (
                module, operation, user_id, username, user_role, department_id, department_name,
                file_name, total_rows, success_rows, failed_rows, skipped_rows,
                error_message, import_details, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                log.module.to_db_str(),
                log.operation,
                log.user_id,
                log.username,
                log.user_role,
                log.department_id,
                log.department_name,
                log.file_name,
                log.total_rows,
                log.success_rows,
                log.failed_rows,
                log.skipped_rows,
                log.error_message,
                details,
                chrono::Local::now().naive_local()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 日志列表（最新在前）
    ///
    /// # 参数
    /// - `department_ids`: None 表示不限部门；Some 时仅返回这些部门的日志
    pub fn list(
        &self,
        module: Option<&str>,
        department_ids: Option<&[i64]>,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<Vec<ImportLog>> {
        let mut sql = String::from(
            r#"
            SELECT id, module, operation, user_id, username, user_role, department_id,
                   department_name, file_name, total_rows, success_rows, failed_rows,
                   skipped_rows, error_message, import_details, created_at
            FROM import_logs WHERE 1 = 1
            "#,
        );
        let mut args: Vec<SqlValue> = Vec::new();
        if let Some(m) = module.map(str::trim).filter(|s| !s.is_empty()) {
            args.push(SqlValue::Text(m.to_string()));
            sql.push_str(&format!(" AND module = ?{}", args.len()));
        }
        if let Some(ids) = department_ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders: Vec<String> = ids
                .iter()
                .map(|id| {
                    args.push(SqlValue::Integer(*id));
                    format!("?{}", args.len())
                })
                .collect();
            sql.push_str(&format!(" AND department_id IN ({})", placeholders.join(", ")));
        }
        args.push(SqlValue::Integer(limit));
        sql.push_str(&format!(" ORDER BY created_at DESC, id DESC LIMIT ?{}", args.len()));
        args.push(SqlValue::Integer(offset));
        sql.push_str(&format!(" OFFSET ?{}", args.len()));

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(args), |row| {
                Ok((
                    ImportLog {
                        id: row.get(0)?,
                        module: row.get(1)?,
                        operation: row.get(2)?,
                        user_id: row.get(3)?,
                        username: row.get(4)?,
                        user_role: row.get(5)?,
                        department_id: row.get(6)?,
                        department_name: row.get(7)?,
                        file_name: row.get(8)?,
                        total_rows: row.get(9)?,
                        success_rows: row.get(10)?,
                        failed_rows: row.get(11)?,
                        skipped_rows: row.get(12)?,
                        error_message: row.get(13)?,
                        import_details: None,
                        created_at: row.get(15)?,
                    },
                    row.get::<_, Option<String>>(14)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(mut log, details)| -> RepositoryResult<ImportLog> {
                log.import_details = details
                    .filter(|d| !d.is_empty())
                    .map(|d| serde_json::from_str(&d))
                    .transpose()?;
                Ok(log)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ImportModule;
    use crate::repository::test_support::setup_conn;
    use serde_json::json;

    fn log(module: ImportModule, dept: Option<i64>) -> NewImportLog {
        NewImportLog {
            module,
            operation: "import".to_string(),
            user_id: Some(1),
            username: Some("admin".to_string()),
            user_role: Some("admin".to_string()),
            department_id: dept,
            department_name: None,
            file_name: Some("a.xlsx".to_string()),
            total_rows: 3,
            success_rows: 2,
            failed_rows: 1,
            skipped_rows: 0,
            error_message: None,
            import_details: Some(json!({"errors": ["第3行: 缺少工号"]})),
        }
    }

    #[test]
    fn test_insert_and_filter() {
        let repo = ImportLogRepository::from_connection(setup_conn());
        repo.insert(&log(ImportModule::Personnel, Some(1))).unwrap();
        repo.insert(&log(ImportModule::Safety, Some(2))).unwrap();

        assert_eq!(repo.list(None, None, 50, 0).unwrap().len(), 2);
        let personnel = repo.list(Some("personnel"), None, 50, 0).unwrap();
        assert_eq!(personnel.len(), 1);
        assert_eq!(
            personnel[0].import_details.as_ref().unwrap()["errors"][0],
            json!("第3行: 缺少工号")
        );

        assert_eq!(repo.list(None, Some(&[2]), 50, 0).unwrap().len(), 1);
        assert!(repo.list(None, Some(&[]), 50, 0).unwrap().is_empty());
        assert_eq!(repo.list(None, None, 1, 1).unwrap().len(), 1);
    }
}
