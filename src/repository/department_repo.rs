// ==========================================
// 班组管理系统 - 部门数据仓储
// ==========================================
// 层级维护: path = 父路径 + "/" + id，移动部门时整棵子树重算
// ==========================================

use crate::domain::department::Department;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const DEPT_COLUMNS: &str =
    "id, name, parent_id, description, manager_user_id, level, path, created_at";

/// 部门仓储
pub struct DepartmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DepartmentRepository {
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

    /// 全部部门（按 path 排序）
    pub fn list_all(&self) -> RepositoryResult<Vec<Department>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM departments ORDER BY path, id", DEPT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], map_department)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Department>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM departments WHERE id = ?1", DEPT_COLUMNS);
        let dept = conn
            .query_row(&sql, params![id], map_department)
            .optional()?;
        Ok(dept)
    }

    /// 按名称查找（同名取 id 最小者）
    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Department>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM departments WHERE name = ?1 ORDER BY id LIMIT 1",
            DEPT_COLUMNS
        );
        let dept = conn
            .query_row(&sql, params![name.trim()], map_department)
            .optional()?;
        Ok(dept)
    }

    /// 新建部门
    ///
    /// level/path 由父部门推导，插入后回写 path
    pub fn create(
        &self,
        name: &str,
        parent: Option<&Department>,
        description: Option<&str>,
        manager_user_id: Option<i64>,
    ) -> RepositoryResult<Department> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let level = parent.map(|p| p.level + 1).unwrap_or(1);
        let now = chrono::Local::now().naive_local();
        tx.execute(
            r#"
            INSERT INTO departments (name, parent_id, description, manager_user_id, level, path, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, '', ?6, ?6)
            "#,
            params![name, parent.map(|p| p.id), description, manager_user_id, level, now],
        )?;
        let id = tx.last_insert_rowid();
        let path = match parent {
            Some(p) => format!("{}/{}", p.path, id),
            None => format!("/{}", id),
        };
        tx.execute(
            "UPDATE departments SET path = ?1 WHERE id = ?2",
            params![path, id],
        )?;
        tx.commit()?;

        Ok(Department {
            id,
            name: name.to_string(),
            parent_id: parent.map(|p| p.id),
            description: description.map(str::to_string),
            manager_user_id,
            level,
            path,
            created_at: Some(now),
        })
    }

    /// 更新名称/描述/负责人；`relocate` 给出时同一事务内移动子树
    pub fn update(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
        manager_user_id: Option<i64>,
        relocate: Option<(&Department, Option<&Department>)>,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let affected = tx.execute(
            r#"
            UPDATE departments
            SET name = ?1, description = ?2, manager_user_id = ?3, updated_at = ?4
            WHERE id = ?5
            "#,
            params![
                name,
                description,
                manager_user_id,
                chrono::Local::now().naive_local(),
                id
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Department", id));
        }
        if let Some((dept, new_parent)) = relocate {
            relocate_subtree(&tx, dept, new_parent)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// 移动部门到新父部门（None 为顶层），重算本部门及全部下级的 level/path
    pub fn move_subtree(
        &self,
        dept: &Department,
        new_parent: Option<&Department>,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        relocate_subtree(&tx, dept, new_parent)?;
        tx.commit()?;
        Ok(())
    }

    pub fn count_children(&self, id: i64) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(1) FROM departments WHERE parent_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 各部门人数
    pub fn employee_counts(&self) -> RepositoryResult<HashMap<i64, i64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT department_id, COUNT(1) FROM employees WHERE department_id IS NOT NULL GROUP BY department_id",
        )?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(counts)
    }

    pub fn delete(&self, id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM departments WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Department", id));
        }
        Ok(())
    }
}

fn relocate_subtree(
    tx: &rusqlite::Transaction<'_>,
    dept: &Department,
    new_parent: Option<&Department>,
) -> RepositoryResult<()> {
    let new_level = new_parent.map(|p| p.level + 1).unwrap_or(1);
    let new_path = match new_parent {
        Some(p) => format!("{}/{}", p.path, dept.id),
        None => format!("/{}", dept.id),
    };
    let level_delta = new_level - dept.level;
    let old_prefix = format!("{}/%", dept.path);
    let old_len = dept.path.chars().count() as i64;

    tx.execute(
        r#"
        UPDATE departments
        SET path = ?1 || substr(path, ?2 + 1),
            level = level + ?3
        WHERE path = ?4 OR path LIKE ?5
        "#,
        params![new_path, old_len, level_delta, dept.path, old_prefix],
    )?;
    tx.execute(
        "UPDATE departments SET parent_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![
            new_parent.map(|p| p.id),
            chrono::Local::now().naive_local(),
            dept.id
        ],
    )?;
    Ok(())
}

fn map_department(row: &Row<'_>) -> rusqlite::Result<Department> {
    Ok(Department {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        description: row.get(3)?,
        manager_user_id: row.get(4)?,
        level: row.get(5)?,
        path: row.get(6)?,
        created_at: row.get(7).ok(),
    })
}
