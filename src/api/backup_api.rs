// ==========================================
// 班组管理系统 - 数据库备份 API
// ==========================================
// 职责: 在线备份、列表、恢复、删除（仅管理员）
// 文件名: backup_YYYYMMDD_HHMMSS[_n].db
// 清理: 超过 30 份或早于 90 天的备份在每次备份后删除
// ==========================================

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use chrono::{Duration, Local, NaiveDateTime};
use regex::Regex;
use rusqlite::{Connection, DatabaseName};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::api::algorithm_config_api::ensure_admin;
use crate::api::error::{ApiError, ApiResult};
use crate::domain::user::AuthUser;
use crate::i18n::t;

const MAX_BACKUPS: usize = 30;
const MAX_AGE_DAYS: i64 = 90;
const NAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

fn name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^backup_(\d{8}_\d{6})(?:_\d+)?\.db$").ok())
        .as_ref()
}

/// 从备份文件名解析创建时间；不符合命名规则返回 None
pub fn parse_backup_name(name: &str) -> Option<NaiveDateTime> {
    let caps = name_pattern()?.captures(name)?;
    NaiveDateTime::parse_from_str(caps.get(1)?.as_str(), NAME_TIME_FORMAT).ok()
}

/// 需要清理的备份: 按时间倒序保留前 MAX_BACKUPS 份，其余及过期者删除
pub fn expired_backups(backups: &[(String, NaiveDateTime)], now: NaiveDateTime) -> Vec<String> {
    let mut sorted: Vec<&(String, NaiveDateTime)> = backups.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
    let cutoff = now - Duration::days(MAX_AGE_DAYS);
    sorted
        .into_iter()
        .enumerate()
        .filter(|(i, (_, created))| *i >= MAX_BACKUPS || *created < cutoff)
        .map(|(_, (name, _))| name.clone())
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub name: String,
    pub size_bytes: u64,
    pub created_at: NaiveDateTime,
}

pub struct BackupApi {
    conn: Arc<Mutex<Connection>>,
    backup_dir: PathBuf,
}

impl BackupApi {
    pub fn new(conn: Arc<Mutex<Connection>>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            conn,
            backup_dir: backup_dir.into(),
        }
    }

    fn get_conn(&self) -> ApiResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))
    }

    /// 校验文件名并返回完整路径
    fn resolve(&self, name: &str) -> ApiResult<PathBuf> {
        if parse_backup_name(name).is_none() {
            return Err(ApiError::InvalidInput(t("backup.invalid_name")));
        }
        Ok(self.backup_dir.join(name))
    }

    fn io_error(err: std::io::Error) -> ApiError {
        ApiError::InternalError(err.to_string())
    }

    /// 创建备份
    #[instrument(skip(self, user))]
    pub fn create_backup(&self, user: &AuthUser, description: Option<&str>) -> ApiResult<BackupInfo> {
        ensure_admin(user)?;
        fs::create_dir_all(&self.backup_dir).map_err(Self::io_error)?;

        let now = Local::now().naive_local();
        let stamp = now.format(NAME_TIME_FORMAT).to_string();
        let mut name = format!("backup_{}.db", stamp);
        let mut seq = 1;
        while self.backup_dir.join(&name).exists() {
            name = format!("backup_{}_{}.db", stamp, seq);
            seq += 1;
        }
        let path = self.backup_dir.join(&name);

        {
            let conn = self.get_conn()?;
            conn.backup(DatabaseName::Main, &path, None)
                .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        }
        let size_bytes = fs::metadata(&path).map_err(Self::io_error)?.len();
        info!(name = %name, size_bytes, description = description.unwrap_or(""), "数据库备份完成");

        self.cleanup(now)?;
        Ok(BackupInfo {
            name,
            size_bytes,
            created_at: now,
        })
    }

    fn cleanup(&self, now: NaiveDateTime) -> ApiResult<()> {
        let backups: Vec<(String, NaiveDateTime)> = self
            .scan()?
            .into_iter()
            .map(|b| (b.name, b.created_at))
            .collect();
        for name in expired_backups(&backups, now) {
            if let Err(e) = fs::remove_file(self.backup_dir.join(&name)) {
                warn!(name = %name, error = %e, "清理旧备份失败");
            } else {
                info!(name = %name, "已清理旧备份");
            }
        }
        Ok(())
    }

    fn scan(&self) -> ApiResult<Vec<BackupInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }
        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.backup_dir).map_err(Self::io_error)? {
            let entry = entry.map_err(Self::io_error)?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(created_at) = parse_backup_name(&name) else {
                continue;
            };
            let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
            backups.push(BackupInfo {
                name,
                size_bytes,
                created_at,
            });
        }
        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.name.cmp(&a.name)));
        Ok(backups)
    }

    /// 备份列表（新→旧）
    pub fn list_backups(&self, user: &AuthUser) -> ApiResult<Vec<BackupInfo>> {
        ensure_admin(user)?;
        self.scan()
    }

    /// 从备份恢复到当前连接
    #[instrument(skip(self, user))]
    pub fn restore_backup(&self, user: &AuthUser, name: &str) -> ApiResult<()> {
        ensure_admin(user)?;
        let path = self.resolve(name)?;
        if !path.exists() {
            return Err(ApiError::not_found("Backup", name));
        }
        let mut conn = self.get_conn()?;
        conn.restore(DatabaseName::Main, &path, None::<fn(rusqlite::backup::Progress)>)
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        info!(name, "数据库已从备份恢复");
        Ok(())
    }

    #[instrument(skip(self, user))]
    pub fn delete_backup(&self, user: &AuthUser, name: &str) -> ApiResult<()> {
        ensure_admin(user)?;
        let path = self.resolve(name)?;
        if !path.exists() {
            return Err(ApiError::not_found("Backup", name));
        }
        fs::remove_file(&path).map_err(Self::io_error)?;
        info!(name, "备份已删除");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::UserRole;
    use crate::repository::test_support::setup_conn;
    use crate::repository::UserRepository;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn setup() -> (BackupApi, AuthUser, tempfile::TempDir) {
        let conn = setup_conn();
        let dir = tempfile::tempdir().unwrap();
        let admin = UserRepository::from_connection(conn.clone())
            .load_auth_user(1)
            .unwrap()
            .unwrap();
        (BackupApi::new(conn, dir.path().join("backups")), admin, dir)
    }

    #[test]
    fn test_parse_backup_name() {
        assert_eq!(
            parse_backup_name("backup_20240301_080000.db"),
            Some(at(2024, 3, 1))
        );
        assert!(parse_backup_name("backup_20240301_080000_2.db").is_some());
        assert!(parse_backup_name("../backup_20240301_080000.db").is_none());
        assert!(parse_backup_name("backup_2024.db").is_none());
        assert!(parse_backup_name("team.db").is_none());
    }

    #[test]
    fn test_expired_backups_by_count_and_age() {
        let now = at(2024, 6, 1);
        let mut backups: Vec<(String, NaiveDateTime)> = (0..32)
            .map(|i| {
                let t = now - Duration::hours(i);
                (format!("backup_{}.db", t.format(NAME_TIME_FORMAT)), t)
            })
            .collect();
        backups.push(("backup_20240101_080000.db".to_string(), at(2024, 1, 1)));

        let expired = expired_backups(&backups, now);
        assert_eq!(expired.len(), 3);
        assert!(expired.contains(&"backup_20240101_080000.db".to_string()));
        assert!(!expired.contains(&backups[0].0));
    }

    #[test]
    fn test_create_list_restore_delete() {
        let (api, admin, _dir) = setup();
        let first = api.create_backup(&admin, Some("月底")).unwrap();
        let second = api.create_backup(&admin, None).unwrap();
        assert_ne!(first.name, second.name);
        assert!(first.size_bytes > 0);

        let listed = api.list_backups(&admin).unwrap();
        assert_eq!(listed.len(), 2);

        {
            let conn = api.get_conn().unwrap();
            conn.execute(
                "INSERT INTO employees (emp_no, name) VALUES ('X1', '临时')",
                [],
            )
            .unwrap();
        }
        api.restore_backup(&admin, &first.name).unwrap();
        let count: i64 = api
            .get_conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM employees", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);

        api.delete_backup(&admin, &second.name).unwrap();
        assert_eq!(api.list_backups(&admin).unwrap().len(), 1);
        assert!(matches!(
            api.delete_backup(&admin, &second.name),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_rejects_traversal_and_non_admin() {
        let (api, admin, _dir) = setup();
        assert!(matches!(
            api.restore_backup(&admin, "../../etc/passwd"),
            Err(ApiError::InvalidInput(_))
        ));
        let viewer = AuthUser {
            id: 9,
            username: "v".to_string(),
            display_name: None,
            role: UserRole::User,
            department_id: Some(1),
            department_name: None,
            department_path: Some("/1".to_string()),
        };
        assert!(matches!(
            api.list_backups(&viewer),
            Err(ApiError::PermissionDenied(_))
        ));
    }
}
