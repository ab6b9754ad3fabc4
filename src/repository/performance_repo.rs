// ==========================================
// 班组管理系统 - 绩效数据仓储
// ==========================================
// 表: performance_records (月度) / grade_map /
//     quarter_overrides / quarter_grade_options
// ==========================================

use crate::domain::performance::{GradeOption, PerformanceRecord, QuarterOverride};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const RECORD_COLUMNS: &str = r#"
    p.id, p.emp_no, p.name, p.year, p.month, p.score, p.grade, p.src_file,
    e.department_id, d.name, p.created_at
"#;

const RECORD_FROM: &str = r#"
    FROM performance_records p
    LEFT JOIN employees e ON e.emp_no = p.emp_no
    LEFT JOIN departments d ON d.id = e.department_id
"#;

/// 待写入的月度绩效
#[derive(Debug, Clone)]
pub struct PerformanceUpsert<'a> {
    pub emp_no: &'a str,
    pub name: &'a str,
    pub year: i32,
    pub month: u32,
    pub score: Option<f64>,
    pub grade: Option<&'a str>,
    pub src_file: Option<&'a str>,
    pub created_by: Option<i64>,
}

/// 绩效仓储
pub struct PerformanceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PerformanceRepository {
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
    // 月度绩效
    // ==========================================

    /// 绩效列表
    pub fn list(
        &self,
        year: Option<i32>,
        month: Option<u32>,
        emp_no: Option<&str>,
    ) -> RepositoryResult<Vec<PerformanceRecord>> {
        let conn = self.get_conn()?;
        let mut sql = format!("SELECT {} {} WHERE 1 = 1", RECORD_COLUMNS, RECORD_FROM);
        let mut args: Vec<SqlValue> = Vec::new();
        if let Some(y) = year {
            args.push(SqlValue::Integer(y as i64));
            sql.push_str(&format!(" AND p.year = ?{}", args.len()));
        }
        if let Some(m) = month {
            args.push(SqlValue::Integer(m as i64));
            sql.push_str(&format!(" AND p.month = ?{}", args.len()));
        }
        if let Some(no) = emp_no.map(str::trim).filter(|s| !s.is_empty()) {
            args.push(SqlValue::Text(no.to_string()));
            sql.push_str(&format!(" AND p.emp_no = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY p.year DESC, p.month DESC, p.emp_no");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), map_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 指定年份、月份区间内的全部记录（季度汇总用）
    pub fn list_by_months(
        &self,
        year: i32,
        first_month: u32,
        last_month: u32,
    ) -> RepositoryResult<Vec<PerformanceRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} {} WHERE p.year = ?1 AND p.month BETWEEN ?2 AND ?3 ORDER BY p.emp_no, p.month",
            RECORD_COLUMNS, RECORD_FROM
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![year, first_month, last_month], map_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 单人区间记录（按时间升序），区间以 year*100+month 比较
    pub fn list_for_employee(
        &self,
        emp_no: &str,
        start_ym: i32,
        end_ym: i32,
    ) -> RepositoryResult<Vec<PerformanceRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} {} WHERE p.emp_no = ?1 AND (p.year * 100 + p.month) BETWEEN ?2 AND ?3 ORDER BY p.year, p.month",
            RECORD_COLUMNS, RECORD_FROM
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![emp_no, start_ym, end_ym], map_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<PerformanceRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} {} WHERE p.id = ?1", RECORD_COLUMNS, RECORD_FROM);
        let row = conn.query_row(&sql, params![id], map_record).optional()?;
        Ok(row)
    }

    /// 按 (工号, 年, 月) UPSERT
    pub fn upsert(&self, rec: &PerformanceUpsert<'_>) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO performance_records (emp_no, name, year, month, score, grade, src_file, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(emp_no, year, month) DO UPDATE SET
                name = excluded.name,
                score = excluded.score,
                grade = excluded.grade,
                src_file = excluded.src_file
            "#,
            params![
                rec.emp_no,
                rec.name,
                rec.year,
                rec.month,
                rec.score,
                rec.grade,
                rec.src_file,
                rec.created_by,
                chrono::Local::now().naive_local()
            ],
        )?;
        Ok(())
    }

    pub fn delete(&self, id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM performance_records WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(RepositoryError::not_found("PerformanceRecord", id));
        }
        Ok(())
    }

    /// 等级 → 默认分值
    pub fn grade_map(&self) -> RepositoryResult<HashMap<String, f64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT grade, value FROM grade_map")?;
        let map = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(map)
    }

    // ==========================================
    // 季度等级
    // ==========================================

    pub fn list_grade_options(&self) -> RepositoryResult<Vec<GradeOption>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT grade, display_order, is_default, color FROM quarter_grade_options ORDER BY display_order",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(GradeOption {
                    grade: row.get(0)?,
                    display_order: row.get(1)?,
                    is_default: row.get::<_, i64>(2)? != 0,
                    color: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 某季度全部人工调整（按工号索引）
    pub fn list_overrides(
        &self,
        year: i32,
        quarter: u32,
    ) -> RepositoryResult<HashMap<String, QuarterOverride>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT emp_no, year, quarter, grade, updated_by, updated_at
            FROM quarter_overrides WHERE year = ?1 AND quarter = ?2
            "#,
        )?;
        let rows = stmt
            .query_map(params![year, quarter], map_override)?
            .map(|r| r.map(|o| (o.emp_no.clone(), o)))
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(rows)
    }

    pub fn find_override(
        &self,
        emp_no: &str,
        year: i32,
        quarter: u32,
    ) -> RepositoryResult<Option<QuarterOverride>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                r#"
                SELECT emp_no, year, quarter, grade, updated_by, updated_at
                FROM quarter_overrides WHERE emp_no = ?1 AND year = ?2 AND quarter = ?3
                "#,
                params![emp_no, year, quarter],
                map_override,
            )
            .optional()?;
        Ok(row)
    }

    pub fn upsert_override(
        &self,
        emp_no: &str,
        year: i32,
        quarter: u32,
        grade: &str,
        updated_by: Option<i64>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO quarter_overrides (emp_no, year, quarter, grade, updated_by, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(emp_no, year, quarter) DO UPDATE SET
                grade = excluded.grade,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at
            "#,
            params![
                emp_no,
                year,
                quarter,
                grade,
                updated_by,
                chrono::Local::now().naive_local()
            ],
        )?;
        Ok(())
    }

    /// 删除人工调整，返回是否存在
    pub fn delete_override(&self, emp_no: &str, year: i32, quarter: u32) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM quarter_overrides WHERE emp_no = ?1 AND year = ?2 AND quarter = ?3",
            params![emp_no, year, quarter],
        )?;
        Ok(affected > 0)
    }
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<PerformanceRecord> {
    Ok(PerformanceRecord {
        id: row.get(0)?,
        emp_no: row.get(1)?,
        name: row.get(2)?,
        year: row.get(3)?,
        month: row.get(4)?,
        score: row.get(5)?,
        grade: row.get(6)?,
        src_file: row.get(7)?,
        department_id: row.get(8)?,
        department_name: row.get(9)?,
        created_at: row.get(10).ok(),
    })
}

fn map_override(row: &Row<'_>) -> rusqlite::Result<QuarterOverride> {
    Ok(QuarterOverride {
        emp_no: row.get(0)?,
        year: row.get(1)?,
        quarter: row.get(2)?,
        grade: row.get(3)?,
        updated_by: row.get(4)?,
        updated_at: row.get(5).ok(),
    })
}
