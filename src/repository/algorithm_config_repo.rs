// ==========================================
// 班组管理系统 - 算法配置数据仓储
// ==========================================
// 表: algorithm_presets / algorithm_active_config(单行) / algorithm_config_logs
// 约束: 配置变更与变更日志在同一事务内写入
// ==========================================

use crate::domain::algorithm::{
    ActiveConfig, ActiveConfigInfo, AlgorithmPreset, ConfigChangeLog, NewConfigLog,
};
use crate::domain::types::ConfigAction;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// 算法配置仓储
pub struct AlgorithmConfigRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AlgorithmConfigRepository {
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

    // ==========================================
    // 当前配置
    // ==========================================

    pub fn get_active(&self) -> RepositoryResult<Option<ActiveConfig>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT based_on_preset, is_customized, config_data, updated_by, updated_at
                FROM algorithm_active_config WHERE id = 1
                "#,
                [],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                        row.get::<_, NaiveDateTime>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((based_on_preset, customized, data, updated_by, updated_at)) => {
                Ok(Some(ActiveConfig {
                    based_on_preset,
                    is_customized: customized != 0,
                    config_data: serde_json::from_str(&data)?,
                    updated_by,
                    updated_at,
                }))
            }
        }
    }

    /// 仅读取更新时间（缓存失效判断）
    pub fn active_updated_at(&self) -> RepositoryResult<Option<NaiveDateTime>> {
        let conn = self.get_conn()?;
        let ts = conn
            .query_row(
                "SELECT updated_at FROM algorithm_active_config WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts)
    }

    /// 当前配置概要（含预设名与更新人）
    pub fn active_info(&self) -> RepositoryResult<Option<ActiveConfigInfo>> {
        let conn = self.get_conn()?;
        let info = conn
            .query_row(
                r#"
                SELECT a.based_on_preset, p.preset_name, a.is_customized,
                       a.updated_by, u.username, a.updated_at
                FROM algorithm_active_config a
                LEFT JOIN algorithm_presets p ON p.preset_key = a.based_on_preset
                LEFT JOIN users u ON u.id = a.updated_by
                WHERE a.id = 1
                "#,
                [],
                |row| {
                    Ok(ActiveConfigInfo {
                        based_on_preset: row.get(0)?,
                        preset_name: row.get(1)?,
                        is_customized: row.get::<_, i64>(2)? != 0,
                        updated_by: row.get(3)?,
                        updated_by_name: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(info)
    }

    /// 替换当前配置并记录日志
    pub fn save_active(
        &self,
        based_on_preset: Option<&str>,
        is_customized: bool,
        config: &Value,
        updated_by: Option<i64>,
        log: &NewConfigLog<'_>,
    ) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        write_active(&tx, based_on_preset, is_customized, config, updated_by)?;
        let log_id = write_log(&tx, log)?;
        tx.commit()?;
        Ok(log_id)
    }

    // ==========================================
    // 预设
    // ==========================================

    pub fn list_presets(&self) -> RepositoryResult<Vec<AlgorithmPreset>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, preset_name, preset_key, description, config_data, updated_at
            FROM algorithm_presets ORDER BY id
            "#,
        )?;
        let raw = stmt
            .query_map([], map_preset_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(into_preset).collect()
    }

    pub fn find_preset(&self, key: &str) -> RepositoryResult<Option<AlgorithmPreset>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                r#"
                SELECT id, preset_name, preset_key, description, config_data, updated_at
                FROM algorithm_presets WHERE preset_key = ?1
                "#,
                params![key],
                map_preset_row,
            )
            .optional()?;
        raw.map(into_preset).transpose()
    }

    /// 更新预设配置并记录日志
    ///
    /// `sync_active` 为 true 时同步刷新当前配置（未自定义且基于该预设）
    pub fn save_preset(
        &self,
        key: &str,
        config: &Value,
        sync_active: Option<Option<i64>>,
        log: &NewConfigLog<'_>,
    ) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let affected = tx.execute(
            "UPDATE algorithm_presets SET config_data = ?1, updated_at = ?2 WHERE preset_key = ?3",
            params![
                serde_json::to_string(config)?,
                chrono::Local::now().naive_local(),
                key
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("AlgorithmPreset", key));
        }
        if let Some(updated_by) = sync_active {
            write_active(&tx, Some(key), false, config, updated_by)?;
        }
        let log_id = write_log(&tx, log)?;
        tx.commit()?;
        Ok(log_id)
    }

    // ==========================================
    // 变更日志
    // ==========================================

    /// 日志列表（最新在前）
    pub fn list_logs(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<ConfigChangeLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, action, preset_name, old_config, new_config, change_reason,
                   changed_by, changed_by_name, changed_at
            FROM algorithm_config_logs
            ORDER BY changed_at DESC, id DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )?;
        let raw = stmt
            .query_map(params![limit, offset], map_log_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(into_log).collect()
    }

    pub fn find_log(&self, id: i64) -> RepositoryResult<Option<ConfigChangeLog>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                r#"
                SELECT id, action, preset_name, old_config, new_config, change_reason,
                       changed_by, changed_by_name, changed_at
                FROM algorithm_config_logs WHERE id = ?1
                "#,
                params![id],
                map_log_row,
            )
            .optional()?;
        raw.map(into_log).transpose()
    }
}

fn write_active(
    tx: &Transaction<'_>,
    based_on_preset: Option<&str>,
    is_customized: bool,
    config: &Value,
    updated_by: Option<i64>,
) -> RepositoryResult<()> {
    tx.execute(
        r#"
        INSERT INTO algorithm_active_config (id, based_on_preset, is_customized, config_data, updated_by, updated_at)
        VALUES (1, ?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(id) DO UPDATE SET
            based_on_preset = excluded.based_on_preset,
            is_customized = excluded.is_customized,
            config_data = excluded.config_data,
            updated_by = excluded.updated_by,
            updated_at = excluded.updated_at
        "#,
        params![
            based_on_preset,
            is_customized,
            serde_json::to_string(config)?,
            updated_by,
            chrono::Local::now().naive_local()
        ],
    )?;
    Ok(())
}

fn write_log(tx: &Transaction<'_>, log: &NewConfigLog<'_>) -> RepositoryResult<i64> {
    let old = log.old_config.map(serde_json::to_string).transpose()?;
    let new = log.new_config.map(serde_json::to_string).transpose()?;
    tx.execute(
        r#"
        INSERT INTO algorithm_config_logs (
            action, preset_name, old_config, new_config, change_reason,
            changed_by, changed_by_name, changed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            log.action.to_db_str(),
            log.preset_name,
            old,
            new,
            log.change_reason,
            log.changed_by,
            log.changed_by_name,
            chrono::Local::now().naive_local()
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

type PresetRow = (i64, String, String, Option<String>, String, Option<NaiveDateTime>);

fn map_preset_row(row: &Row<'_>) -> rusqlite::Result<PresetRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5).ok(),
    ))
}

fn into_preset(raw: PresetRow) -> RepositoryResult<AlgorithmPreset> {
    let (id, preset_name, preset_key, description, data, updated_at) = raw;
    Ok(AlgorithmPreset {
        id,
        preset_name,
        preset_key,
        description,
        config_data: serde_json::from_str(&data)?,
        updated_at,
    })
}

struct LogRow {
    id: i64,
    action: String,
    preset_name: Option<String>,
    old_config: Option<String>,
    new_config: Option<String>,
    change_reason: Option<String>,
    changed_by: Option<i64>,
    changed_by_name: Option<String>,
    changed_at: NaiveDateTime,
}

fn map_log_row(row: &Row<'_>) -> rusqlite::Result<LogRow> {
    Ok(LogRow {
        id: row.get(0)?,
        action: row.get(1)?,
        preset_name: row.get(2)?,
        old_config: row.get(3)?,
        new_config: row.get(4)?,
        change_reason: row.get(5)?,
        changed_by: row.get(6)?,
        changed_by_name: row.get(7)?,
        changed_at: row.get(8)?,
    })
}

fn into_log(raw: LogRow) -> RepositoryResult<ConfigChangeLog> {
    let action = ConfigAction::from_str(&raw.action).ok_or_else(|| {
        RepositoryError::FieldValueError {
            field: "action".to_string(),
            message: format!("未知的配置动作: {}", raw.action),
        }
    })?;
    let parse = |s: Option<String>| -> RepositoryResult<Option<Value>> {
        match s {
            Some(text) if !text.is_empty() => Ok(Some(serde_json::from_str(&text)?)),
            _ => Ok(None),
        }
    };
    Ok(ConfigChangeLog {
        id: raw.id,
        action,
        preset_name: raw.preset_name,
        old_config: parse(raw.old_config)?,
        new_config: parse(raw.new_config)?,
        change_reason: raw.change_reason,
        changed_by: raw.changed_by,
        changed_by_name: raw.changed_by_name,
        changed_at: raw.changed_at,
    })
}
