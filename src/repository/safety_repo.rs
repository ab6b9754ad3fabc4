// ==========================================
// 班组管理系统 - 安全检查数据仓储
// ==========================================
// 表: safety_inspection_records
// ==========================================

use crate::domain::safety::{NewSafetyRecord, SafetyFilter, SafetyRecord};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SAFETY_COLUMNS: &str = r#"
    id, category, inspection_date, location, hazard_description, corrective_measures,
    deadline_date, inspected_person, responsible_team, assessment, rectification_status,
    rectifier, work_type, responsibility_location, inspection_item, source_file, created_at
"#;

/// 安全检查仓储
pub struct SafetyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SafetyRepository {
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

    pub fn list(&self, filter: &SafetyFilter) -> RepositoryResult<Vec<SafetyRecord>> {
        let conn = self.get_conn()?;
        let mut sql = format!(
            "SELECT {} FROM safety_inspection_records WHERE 1 = 1",
            SAFETY_COLUMNS
        );
        let mut args: Vec<SqlValue> = Vec::new();
        if let Some(start) = filter.start_date {
            args.push(SqlValue::Text(start.to_string()));
            sql.push_str(&format!(" AND inspection_date >= ?{}", args.len()));
        }
        if let Some(end) = filter.end_date {
            args.push(SqlValue::Text(end.to_string()));
            sql.push_str(&format!(" AND inspection_date <= ?{}", args.len()));
        }
        for (column, value) in [
            ("inspected_person", &filter.inspected_person),
            ("responsible_team", &filter.responsible_team),
            ("rectification_status", &filter.rectification_status),
        ] {
            if let Some(v) = value.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                args.push(SqlValue::Text(format!("%{}%", v)));
                sql.push_str(&format!(" AND {} LIKE ?{}", column, args.len()));
            }
        }
        sql.push_str(" ORDER BY inspection_date DESC, id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), map_safety)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 区间内全部记录（评分用）
    pub fn list_between(&self, start: NaiveDate, end: NaiveDate) -> RepositoryResult<Vec<SafetyRecord>> {
        self.list(&SafetyFilter {
            start_date: Some(start),
            end_date: Some(end),
            ..Default::default()
        })
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<SafetyRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM safety_inspection_records WHERE id = ?1",
            SAFETY_COLUMNS
        );
        let row = conn.query_row(&sql, params![id], map_safety).optional()?;
        Ok(row)
    }

    pub fn insert(&self, rec: &NewSafetyRecord, created_by: Option<i64>) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO safety_inspection_records (
                category, inspection_date, location, hazard_description, corrective_measures,
                deadline_date, inspected_person, responsible_team, assessment, rectification_status,
                rectifier, work_type, responsibility_location, inspection_item,
                created_by, source_file, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
            params![
                rec.category,
                rec.inspection_date,
                rec.location,
                rec.hazard_description,
                rec.corrective_measures,
                rec.deadline_date,
                rec.inspected_person,
                rec.responsible_team,
                rec.assessment,
                rec.rectification_status,
                rec.rectifier,
                rec.work_type,
                rec.responsibility_location,
                rec.inspection_item,
                created_by,
                rec.source_file,
                chrono::Local::now().naive_local()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(&self, id: i64, rec: &NewSafetyRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE safety_inspection_records SET
                category = ?1, inspection_date = ?2, location = ?3, hazard_description = ?4,
                corrective_measures = ?5, deadline_date = ?6, inspected_person = ?7,
                responsible_team = ?8, assessment = ?9, rectification_status = ?10,
                rectifier = ?11, work_type = ?12, responsibility_location = ?13,
                inspection_item = ?14
            WHERE id = ?15
            "#,
            params![
                rec.category,
                rec.inspection_date,
                rec.location,
                rec.hazard_description,
                rec.corrective_measures,
                rec.deadline_date,
                rec.inspected_person,
                rec.responsible_team,
                rec.assessment,
                rec.rectification_status,
                rec.rectifier,
                rec.work_type,
                rec.responsibility_location,
                rec.inspection_item,
                id
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("SafetyRecord", id));
        }
        Ok(())
    }

    pub fn delete(&self, id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM safety_inspection_records WHERE id = ?1",
            params![id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("SafetyRecord", id));
        }
        Ok(())
    }
}

fn map_safety(row: &Row<'_>) -> rusqlite::Result<SafetyRecord> {
    Ok(SafetyRecord {
        id: row.get(0)?,
        category: row.get(1)?,
        inspection_date: row.get(2)?,
        location: row.get(3)?,
        hazard_description: row.get(4)?,
        corrective_measures: row.get(5)?,
        deadline_date: row.get(6).ok().flatten(),
        inspected_person: row.get(7)?,
        responsible_team: row.get(8)?,
        assessment: row.get(9)?,
        rectification_status: row.get(10)?,
        rectifier: row.get(11)?,
        work_type: row.get(12)?,
        responsibility_location: row.get(13)?,
        inspection_item: row.get(14)?,
        source_file: row.get(15)?,
        created_at: row.get(16).ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::setup_conn;

    fn record(person: &str, date: &str, assessment: &str) -> NewSafetyRecord {
        NewSafetyRecord {
            category: Some("日常检查".to_string()),
            inspection_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            location: None,
            hazard_description: Some("未系安全带".to_string()),
            corrective_measures: None,
            deadline_date: None,
            inspected_person: Some(person.to_string()),
            responsible_team: Some("甲班".to_string()),
            assessment: Some(assessment.to_string()),
            rectification_status: Some("已整改".to_string()),
            rectifier: None,
            work_type: None,
            responsibility_location: None,
            inspection_item: None,
            source_file: None,
        }
    }

    #[test]
    fn test_insert_list_update_delete() {
        let repo = SafetyRepository::from_connection(setup_conn());
        let id = repo.insert(&record("张三", "2024-03-01", "扣3分"), None).unwrap();
        repo.insert(&record("李四", "2024-04-01", "扣2分"), None).unwrap();

        let by_person = repo
            .list(&SafetyFilter {
                inspected_person: Some("张".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_person.len(), 1);

        let march = repo
            .list_between(
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            )
            .unwrap();
        assert_eq!(march.len(), 1);

        let mut changed = record("张三", "2024-03-02", "扣5分");
        changed.rectification_status = Some("未整改".to_string());
        repo.update(id, &changed).unwrap();
        let stored = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(stored.assessment.as_deref(), Some("扣5分"));

        repo.delete(id).unwrap();
        assert!(repo.find_by_id(id).unwrap().is_none());
    }
}
