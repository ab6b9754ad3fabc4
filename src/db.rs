// ==========================================
// 班组管理系统 - SQLite 连接初始化与建库
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表/建索引幂等，启动时补齐基础数据（根部门、管理员、算法预设）
// ==========================================

use crate::config::presets;
use crate::security;
use rusqlite::{params, Connection, OptionalExtension};
use std::time::Duration;
use tracing::info;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS departments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    parent_id INTEGER REFERENCES departments(id) ON DELETE RESTRICT,
    description TEXT,
    manager_user_id INTEGER,
    level INTEGER NOT NULL DEFAULT 1,
    path TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_departments_parent ON departments(parent_id);
CREATE INDEX IF NOT EXISTS idx_departments_path ON departments(path);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    display_name TEXT,
    department_id INTEGER REFERENCES departments(id) ON DELETE SET NULL,
    role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'manager', 'user')),
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_users_department ON users(department_id);

CREATE TABLE IF NOT EXISTS employees (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    emp_no TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    department_id INTEGER REFERENCES departments(id) ON DELETE RESTRICT,
    class_name TEXT,
    position TEXT,
    birth_date TEXT,
    certification_date TEXT,
    solo_driving_date TEXT,
    marital_status TEXT,
    hometown TEXT,
    political_status TEXT,
    education TEXT,
    graduation_school TEXT,
    work_start_date TEXT,
    entry_date TEXT,
    specialty TEXT,
    created_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_employees_department ON employees(department_id);
CREATE INDEX IF NOT EXISTS idx_employees_name ON employees(name);

CREATE TABLE IF NOT EXISTS performance_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    emp_no TEXT NOT NULL,
    name TEXT NOT NULL,
    year INTEGER NOT NULL,
    month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    score REAL,
    grade TEXT,
    src_file TEXT,
    created_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (emp_no, year, month)
);
CREATE INDEX IF NOT EXISTS idx_performance_year_month ON performance_records(year, month);

CREATE TABLE IF NOT EXISTS grade_map (
    grade TEXT PRIMARY KEY,
    value REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS quarter_overrides (
    emp_no TEXT NOT NULL,
    year INTEGER NOT NULL,
    quarter INTEGER NOT NULL CHECK (quarter BETWEEN 1 AND 4),
    grade TEXT NOT NULL,
    updated_by INTEGER,
    updated_at TEXT,
    PRIMARY KEY (emp_no, year, quarter)
);

CREATE TABLE IF NOT EXISTS quarter_grade_options (
    grade TEXT PRIMARY KEY,
    display_order INTEGER NOT NULL,
    is_default INTEGER NOT NULL DEFAULT 0,
    color TEXT
);

CREATE TABLE IF NOT EXISTS training_project_categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS training_projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    category_id INTEGER REFERENCES training_project_categories(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_training_projects_category ON training_projects(category_id);

CREATE TABLE IF NOT EXISTS training_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    emp_no TEXT NOT NULL,
    name TEXT NOT NULL,
    team_name TEXT,
    training_date TEXT NOT NULL,
    project_id INTEGER REFERENCES training_projects(id) ON DELETE RESTRICT,
    project_name_snapshot TEXT,
    category_name_snapshot TEXT,
    problem_type TEXT,
    specific_problem TEXT,
    corrective_measures TEXT,
    time_spent REAL,
    score REAL,
    assessor TEXT,
    remarks TEXT,
    is_qualified INTEGER NOT NULL DEFAULT 1,
    is_disqualified INTEGER NOT NULL DEFAULT 0,
    is_retake INTEGER NOT NULL DEFAULT 0,
    retake_of_record_id INTEGER REFERENCES training_records(id) ON DELETE SET NULL,
    created_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
    source_file TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_training_emp_date ON training_records(emp_no, training_date);
CREATE INDEX IF NOT EXISTS idx_training_project ON training_records(project_id);

CREATE TABLE IF NOT EXISTS safety_inspection_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT,
    inspection_date TEXT NOT NULL,
    location TEXT,
    hazard_description TEXT,
    corrective_measures TEXT,
    deadline_date TEXT,
    inspected_person TEXT,
    responsible_team TEXT,
    assessment TEXT,
    rectification_status TEXT,
    rectifier TEXT,
    work_type TEXT,
    responsibility_location TEXT,
    inspection_item TEXT,
    created_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
    source_file TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_safety_person_date ON safety_inspection_records(inspected_person, inspection_date);
CREATE INDEX IF NOT EXISTS idx_safety_date ON safety_inspection_records(inspection_date);

CREATE TABLE IF NOT EXISTS import_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    module TEXT NOT NULL,
    operation TEXT NOT NULL,
    user_id INTEGER,
    username TEXT,
    user_role TEXT,
    department_id INTEGER,
    department_name TEXT,
    file_name TEXT,
    total_rows INTEGER NOT NULL DEFAULT 0,
    success_rows INTEGER NOT NULL DEFAULT 0,
    failed_rows INTEGER NOT NULL DEFAULT 0,
    skipped_rows INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    import_details TEXT,
    ip_address TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_import_logs_module ON import_logs(module);
CREATE INDEX IF NOT EXISTS idx_import_logs_created ON import_logs(created_at);

CREATE TABLE IF NOT EXISTS algorithm_presets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    preset_name TEXT NOT NULL UNIQUE,
    preset_key TEXT NOT NULL UNIQUE,
    description TEXT,
    config_data TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS algorithm_active_config (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    based_on_preset TEXT,
    is_customized INTEGER NOT NULL DEFAULT 0,
    config_data TEXT NOT NULL,
    updated_by INTEGER,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS algorithm_config_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    action TEXT NOT NULL,
    preset_name TEXT,
    old_config TEXT,
    new_config TEXT,
    change_reason TEXT,
    changed_by INTEGER,
    changed_by_name TEXT,
    changed_at TEXT NOT NULL,
    ip_address TEXT
);
CREATE INDEX IF NOT EXISTS idx_config_logs_changed_at ON algorithm_config_logs(changed_at);
"#;

/// 建表/建索引（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        params![CURRENT_SCHEMA_VERSION, chrono::Local::now().naive_local()],
    )?;
    Ok(())
}

/// 基础数据初始化失败
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("数据库初始化失败: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("管理员密码哈希失败: {0}")]
    PasswordHash(String),

    #[error("预设配置序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// 基础数据初始化（幂等）
///
/// - 无部门时创建根部门 "总公司"
/// - 无用户时按 APP_USER/APP_PASS 创建管理员
/// - 等级映射、季度等级选项、算法预设缺失时补齐
pub fn bootstrap(
    conn: &Connection,
    admin_username: &str,
    admin_password: &str,
) -> Result<(), BootstrapError> {
    let dept_count: i64 = conn.query_row("SELECT COUNT(1) FROM departments", [], |r| r.get(0))?;
    if dept_count == 0 {
        conn.execute(
            "INSERT INTO departments (id, name, parent_id, description, level, path)
             VALUES (1, '总公司', NULL, '顶级部门', 1, '/1')",
            [],
        )?;
        info!("已创建根部门: 总公司");
    }

    let user_count: i64 = conn.query_row("SELECT COUNT(1) FROM users", [], |r| r.get(0))?;
    if user_count == 0 {
        let hash = security::hash_password(admin_password)
            .map_err(|e| BootstrapError::PasswordHash(e.to_string()))?;
        conn.execute(
            "INSERT INTO users (username, password_hash, display_name, department_id, role)
             VALUES (?1, ?2, '系统管理员', 1, 'admin')",
            params![admin_username, hash],
        )?;
        info!(username = admin_username, "已创建默认管理员账号");
    }

    for (grade, value) in [("A", 100.0), ("B+", 95.0), ("B", 90.0), ("C", 80.0), ("D", 70.0)] {
        conn.execute(
            "INSERT OR IGNORE INTO grade_map (grade, value) VALUES (?1, ?2)",
            params![grade, value],
        )?;
    }

    let options = [
        ("A", 1, 0, "#52c41a"),
        ("B+", 2, 1, "#1890ff"),
        ("B", 3, 0, "#faad14"),
        ("C", 4, 0, "#fa8c16"),
        ("D", 5, 0, "#f5222d"),
    ];
    for (grade, order, is_default, color) in options {
        conn.execute(
            "INSERT OR IGNORE INTO quarter_grade_options (grade, display_order, is_default, color)
             VALUES (?1, ?2, ?3, ?4)",
            params![grade, order, is_default, color],
        )?;
    }

    init_algorithm_presets(conn)?;
    Ok(())
}

fn init_algorithm_presets(conn: &Connection) -> Result<(), BootstrapError> {
    let preset_count: i64 =
        conn.query_row("SELECT COUNT(1) FROM algorithm_presets", [], |r| r.get(0))?;
    if preset_count > 0 {
        return Ok(());
    }

    let now = chrono::Local::now().naive_local();
    for preset in presets::builtin_presets() {
        conn.execute(
            "INSERT INTO algorithm_presets (preset_name, preset_key, description, config_data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                preset.name,
                preset.key,
                preset.description,
                serde_json::to_string(&preset.config)?,
                now
            ],
        )?;
    }

    let standard = serde_json::to_string(&presets::standard_config())?;
    conn.execute(
        "INSERT OR REPLACE INTO algorithm_active_config (id, based_on_preset, is_customized, config_data, updated_by, updated_at)
         VALUES (1, 'standard', 0, ?1, NULL, ?2)",
        params![standard, now],
    )?;
    conn.execute(
        "INSERT INTO algorithm_config_logs (action, preset_name, new_config, change_reason, changed_by, changed_by_name, changed_at)
         VALUES ('INIT', 'standard', ?1, '系统初始化', 1, 'system', ?2)",
        params![standard, now],
    )?;

    info!("算法配置初始化完成: 已创建3个预设方案(严格/标准/宽松)，当前配置为'标准'档");
    Ok(())
}
