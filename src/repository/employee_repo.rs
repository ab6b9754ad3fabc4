// ==========================================
// 班组管理系统 - 人员档案数据仓储
// ==========================================
// 写入语义: 以工号为键的 UPSERT
// ==========================================

use crate::domain::employee::{Employee, PersonnelField};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const EMPLOYEE_COLUMNS: &str = r#"
    e.id, e.emp_no, e.name, e.department_id, e.class_name, e.position,
    e.birth_date, e.certification_date, e.solo_driving_date, e.marital_status,
    e.hometown, e.political_status, e.education, e.graduation_school,
    e.work_start_date, e.entry_date, e.specialty, e.created_at, d.name
"#;

/// 人员仓储
pub struct EmployeeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EmployeeRepository {
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

    /// 人员列表（附部门名）
    ///
    /// # 参数
    /// - `department_id`: 仅该部门
    /// - `keyword`: 工号/姓名模糊匹配
    pub fn list(
        &self,
        department_id: Option<i64>,
        keyword: Option<&str>,
    ) -> RepositoryResult<Vec<(Employee, Option<String>)>> {
        let conn = self.get_conn()?;
        let mut sql = format!(
            "SELECT {} FROM employees e LEFT JOIN departments d ON d.id = e.department_id WHERE 1 = 1",
            EMPLOYEE_COLUMNS
        );
        let mut args: Vec<SqlValue> = Vec::new();
        if let Some(dept) = department_id {
            args.push(SqlValue::Integer(dept));
            sql.push_str(&format!(" AND e.department_id = ?{}", args.len()));
        }
        if let Some(kw) = keyword.map(str::trim).filter(|k| !k.is_empty()) {
            args.push(SqlValue::Text(format!("%{}%", kw)));
            let idx = args.len();
            sql.push_str(&format!(" AND (e.emp_no LIKE ?{idx} OR e.name LIKE ?{idx})"));
        }
        sql.push_str(" ORDER BY e.emp_no");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), map_employee_with_dept)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_by_emp_no(&self, emp_no: &str) -> RepositoryResult<Option<(Employee, Option<String>)>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM employees e LEFT JOIN departments d ON d.id = e.department_id WHERE e.emp_no = ?1",
            EMPLOYEE_COLUMNS
        );
        let row = conn
            .query_row(&sql, params![emp_no.trim()], map_employee_with_dept)
            .optional()?;
        Ok(row)
    }

    /// 按姓名查找（安全检查记录以姓名关联人员）
    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Vec<Employee>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM employees e LEFT JOIN departments d ON d.id = e.department_id WHERE e.name = ?1",
            EMPLOYEE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![name.trim()], map_employee_with_dept)?
            .map(|r| r.map(|(e, _)| e))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 新增或更新（按工号），返回 true 表示新增
    pub fn upsert(&self, emp: &Employee, created_by: Option<i64>) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM employees WHERE emp_no = ?1",
                params![emp.emp_no],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        let now = chrono::Local::now().naive_local();

        conn.execute(
            r#"
            INSERT INTO employees (
                emp_no, name, department_id, class_name, position,
                birth_date, certification_date, solo_driving_date, marital_status,
                hometown, political_status, education, graduation_school,
                work_start_date, entry_date, specialty, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?18)
            ON CONFLICT(emp_no) DO UPDATE SET
                name = excluded.name,
                department_id = excluded.department_id,
                class_name = excluded.class_name,
                position = excluded.position,
                birth_date = excluded.birth_date,
                certification_date = excluded.certification_date,
                solo_driving_date = excluded.solo_driving_date,
                marital_status = excluded.marital_status,
                hometown = excluded.hometown,
                political_status = excluded.political_status,
                education = excluded.education,
                graduation_school = excluded.graduation_school,
                work_start_date = excluded.work_start_date,
                entry_date = excluded.entry_date,
                specialty = excluded.specialty,
                updated_at = excluded.updated_at
            "#,
            params![
                emp.emp_no,
                emp.name,
                emp.department_id,
                emp.class_name,
                emp.position,
                emp.birth_date,
                emp.certification_date,
                emp.solo_driving_date,
                emp.marital_status,
                emp.hometown,
                emp.political_status,
                emp.education,
                emp.graduation_school,
                emp.work_start_date,
                emp.entry_date,
                emp.specialty,
                created_by,
                now,
            ],
        )?;
        Ok(!exists)
    }

    /// 更新单个白名单字段
    pub fn update_field(
        &self,
        emp_no: &str,
        field: PersonnelField,
        value: SqlValue,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        // 列名来自白名单枚举，不拼接外部输入
        let sql = format!(
            "UPDATE employees SET {} = ?1, updated_at = ?2 WHERE emp_no = ?3",
            field.column()
        );
        let affected = conn.execute(
            &sql,
            params![value, chrono::Local::now().naive_local(), emp_no],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Employee", emp_no));
        }
        Ok(())
    }

    pub fn delete(&self, emp_no: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM employees WHERE emp_no = ?1", params![emp_no])?;
        Ok(affected)
    }

    pub fn count_by_department(&self, department_id: i64) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(1) FROM employees WHERE department_id = ?1",
            params![department_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn map_employee_with_dept(row: &Row<'_>) -> rusqlite::Result<(Employee, Option<String>)> {
    let emp = Employee {
        id: row.get(0)?,
        emp_no: row.get(1)?,
        name: row.get(2)?,
        department_id: row.get(3)?,
        class_name: row.get(4)?,
        position: row.get(5)?,
        birth_date: row.get(6).ok().flatten(),
        certification_date: row.get(7).ok().flatten(),
        solo_driving_date: row.get(8).ok().flatten(),
        marital_status: row.get(9)?,
        hometown: row.get(10)?,
        political_status: row.get(11)?,
        education: row.get(12)?,
        graduation_school: row.get(13)?,
        work_start_date: row.get(14).ok().flatten(),
        entry_date: row.get(15).ok().flatten(),
        specialty: row.get(16)?,
        created_at: row.get(17).ok(),
    };
    Ok((emp, row.get(18)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::setup_conn;
    use chrono::NaiveDate;

    fn sample(emp_no: &str, name: &str) -> Employee {
        Employee {
            emp_no: emp_no.to_string(),
            name: name.to_string(),
            department_id: Some(1),
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 1),
            education: Some("本科".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_upsert_insert_then_update() {
        let repo = EmployeeRepository::from_connection(setup_conn());
        assert!(repo.upsert(&sample("E001", "张三"), None).unwrap());

        let mut changed = sample("E001", "张三丰");
        changed.education = None;
        assert!(!repo.upsert(&changed, None).unwrap());

        let (emp, dept) = repo.find_by_emp_no("E001").unwrap().unwrap();
        assert_eq!(emp.name, "张三丰");
        assert_eq!(emp.education, None);
        assert_eq!(emp.birth_date, NaiveDate::from_ymd_opt(1990, 5, 1));
        assert_eq!(dept.as_deref(), Some("总公司"));
    }

    #[test]
    fn test_list_keyword_and_department() {
        let repo = EmployeeRepository::from_connection(setup_conn());
        repo.upsert(&sample("E001", "张三"), None).unwrap();
        repo.upsert(&sample("E002", "李四"), None).unwrap();

        assert_eq!(repo.list(None, Some("李")).unwrap().len(), 1);
        assert_eq!(repo.list(Some(1), None).unwrap().len(), 2);
        assert_eq!(repo.list(Some(99), None).unwrap().len(), 0);
        assert_eq!(repo.count_by_department(1).unwrap(), 2);
    }

    #[test]
    fn test_update_field_and_delete() {
        let repo = EmployeeRepository::from_connection(setup_conn());
        repo.upsert(&sample("E001", "张三"), None).unwrap();
        repo.update_field(
            "E001",
            PersonnelField::Position,
            SqlValue::Text("司机".to_string()),
        )
        .unwrap();
        let (emp, _) = repo.find_by_emp_no("E001").unwrap().unwrap();
        assert_eq!(emp.position.as_deref(), Some("司机"));

        assert!(repo
            .update_field("NOPE", PersonnelField::Position, SqlValue::Null)
            .is_err());
        assert_eq!(repo.delete("E001").unwrap(), 1);
        assert_eq!(repo.find_by_name("张三").unwrap().len(), 0);
    }
}
