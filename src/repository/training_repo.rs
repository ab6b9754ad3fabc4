// ==========================================
// 班组管理系统 - 培训数据仓储
// ==========================================
// 表: training_project_categories / training_projects / training_records
// ==========================================

use crate::domain::training::{
    NewTrainingRecord, TrainingCategory, TrainingFilter, TrainingProject, TrainingRecord,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const RECORD_COLUMNS: &str = r#"
    id, emp_no, name, team_name, training_date, project_id,
    project_name_snapshot, category_name_snapshot, problem_type, specific_problem,
    corrective_measures, time_spent, score, assessor, remarks,
    is_qualified, is_disqualified, is_retake, retake_of_record_id, source_file, created_at
"#;

/// 培训仓储
pub struct TrainingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TrainingRepository {
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
    // 分类
    // ==========================================

    pub fn list_categories(&self) -> RepositoryResult<Vec<TrainingCategory>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.id, c.name, COUNT(p.id)
            FROM training_project_categories c
            LEFT JOIN training_projects p ON p.category_id = c.id
            GROUP BY c.id, c.name
            ORDER BY c.id
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TrainingCategory {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    project_count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_category_by_name(&self, name: &str) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        let id = conn
            .query_row(
                "SELECT id FROM training_project_categories WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn category_exists(&self, id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM training_project_categories WHERE id = ?1",
                params![id],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    pub fn create_category(&self, name: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO training_project_categories (name, created_at) VALUES (?1, ?2)",
            params![name, chrono::Local::now().naive_local()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    // ==========================================
    // 项目
    // ==========================================

    pub fn list_projects(&self, category_id: Option<i64>) -> RepositoryResult<Vec<TrainingProject>> {
        let conn = self.get_conn()?;
        let mut sql = String::from(
            r#"
            SELECT p.id, p.name, p.category_id, c.name
            FROM training_projects p
            LEFT JOIN training_project_categories c ON c.id = p.category_id
            "#,
        );
        let mut args: Vec<SqlValue> = Vec::new();
        if let Some(cid) = category_id {
            sql.push_str(" WHERE p.category_id = ?1");
            args.push(SqlValue::Integer(cid));
        }
        sql.push_str(" ORDER BY p.category_id, p.id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), map_project)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_project(&self, id: i64) -> RepositoryResult<Option<TrainingProject>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT p.id, p.name, p.category_id, c.name
                FROM training_projects p
                LEFT JOIN training_project_categories c ON c.id = p.category_id
                WHERE p.id = ?1
                "#,
                params![id],
                map_project,
            )
            .optional()?;
        Ok(row)
    }

    pub fn create_project(&self, name: &str, category_id: Option<i64>) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO training_projects (name, category_id, created_at) VALUES (?1, ?2, ?3)",
            params![name, category_id, chrono::Local::now().naive_local()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn count_records_for_project(&self, project_id: i64) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(1) FROM training_records WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn delete_project(&self, id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM training_projects WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(RepositoryError::not_found("TrainingProject", id));
        }
        Ok(())
    }

    // ==========================================
    // 记录
    // ==========================================

    pub fn list_records(&self, filter: &TrainingFilter) -> RepositoryResult<Vec<TrainingRecord>> {
        let conn = self.get_conn()?;
        let mut sql = format!("SELECT {} FROM training_records WHERE 1 = 1", RECORD_COLUMNS);
        let mut args: Vec<SqlValue> = Vec::new();
        if let Some(no) = filter.emp_no.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            args.push(SqlValue::Text(no.to_string()));
            sql.push_str(&format!(" AND emp_no = ?{}", args.len()));
        }
        if let Some(start) = filter.start_date {
            args.push(SqlValue::Text(start.to_string()));
            sql.push_str(&format!(" AND training_date >= ?{}", args.len()));
        }
        if let Some(end) = filter.end_date {
            args.push(SqlValue::Text(end.to_string()));
            sql.push_str(&format!(" AND training_date <= ?{}", args.len()));
        }
        if let Some(pid) = filter.project_id {
            args.push(SqlValue::Integer(pid));
            sql.push_str(&format!(" AND project_id = ?{}", args.len()));
        }
        if filter.only_failed {
            sql.push_str(" AND (is_disqualified = 1 OR is_qualified = 0 OR score = 0)");
        }
        sql.push_str(" ORDER BY training_date DESC, id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), map_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 单人区间记录
    pub fn list_for_employee(
        &self,
        emp_no: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepositoryResult<Vec<TrainingRecord>> {
        self.list_records(&TrainingFilter {
            emp_no: Some(emp_no.to_string()),
            start_date: Some(start),
            end_date: Some(end),
            ..Default::default()
        })
    }

    pub fn find_record(&self, id: i64) -> RepositoryResult<Option<TrainingRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM training_records WHERE id = ?1", RECORD_COLUMNS);
        let row = conn.query_row(&sql, params![id], map_record).optional()?;
        Ok(row)
    }

    pub fn insert_record(
        &self,
        rec: &NewTrainingRecord,
        created_by: Option<i64>,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO training_records (
                emp_no, name, team_name, training_date, project_id,
                project_name_snapshot, category_name_snapshot, problem_type, specific_problem,
                corrective_measures, time_spent, score, assessor, remarks,
                is_qualified, is_disqualified, is_retake, retake_of_record_id,
                created_by, source_file, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)
            "#,
            params![
                rec.emp_no,
                rec.name,
                rec.team_name,
                rec.training_date,
                rec.project_id,
                rec.project_name,
                rec.category_name,
                rec.problem_type,
                rec.specific_problem,
                rec.corrective_measures,
                rec.time_spent,
                rec.score,
                rec.assessor,
                rec.remarks,
                rec.is_qualified,
                rec.is_disqualified,
                rec.is_retake,
                rec.retake_of_record_id,
                created_by,
                rec.source_file,
                chrono::Local::now().naive_local()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn delete_record(&self, id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM training_records WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(RepositoryError::not_found("TrainingRecord", id));
        }
        Ok(())
    }
}

fn map_project(row: &Row<'_>) -> rusqlite::Result<TrainingProject> {
    Ok(TrainingProject {
        id: row.get(0)?,
        name: row.get(1)?,
        category_id: row.get(2)?,
        category_name: row.get(3)?,
    })
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<TrainingRecord> {
    Ok(TrainingRecord {
        id: row.get(0)?,
        emp_no: row.get(1)?,
        name: row.get(2)?,
        team_name: row.get(3)?,
        training_date: row.get(4)?,
        project_id: row.get(5)?,
        project_name: row.get(6)?,
        category_name: row.get(7)?,
        problem_type: row.get(8)?,
        specific_problem: row.get(9)?,
        corrective_measures: row.get(10)?,
        time_spent: row.get(11)?,
        score: row.get(12)?,
        assessor: row.get(13)?,
        remarks: row.get(14)?,
        is_qualified: row.get(15)?,
        is_disqualified: row.get(16)?,
        is_retake: row.get(17)?,
        retake_of_record_id: row.get(18)?,
        source_file: row.get(19)?,
        created_at: row.get(20).ok(),
    })
}
