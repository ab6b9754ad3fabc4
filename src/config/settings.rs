// ==========================================
// 班组管理系统 - 进程级设置
// ==========================================
// 来源: 环境变量（容器化部署友好）
// ==========================================

use std::path::PathBuf;
use thiserror::Error;

/// 默认上传大小上限 50MB
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 50 * 1024 * 1024;
/// 默认会话有效期（秒）
pub const DEFAULT_SESSION_TIMEOUT_SECS: i64 = 86_400;
/// 默认监听端口
pub const DEFAULT_PORT: u16 = 5001;
/// 默认管理员账号
pub const DEFAULT_ADMIN_USER: &str = "admin";
pub const DEFAULT_ADMIN_PASS: &str = "admin123";

/// 允许上传的文件扩展名
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("环境变量 {key} 格式错误: {value}")]
    InvalidValue { key: String, value: String },

    #[error("生产环境禁止使用默认管理员密码，请设置 APP_PASS")]
    InsecureAdminPassword,
}

/// 进程级设置
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub db_path: String,
    pub host: String,
    pub port: u16,
    pub admin_username: String,
    pub admin_password: String,
    pub max_content_length: usize,
    pub session_timeout_secs: i64,
    pub upload_dir: PathBuf,
    pub export_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub production: bool,
    /// 生产环境允许跨域访问的来源（CORS_ORIGINS，逗号分隔）；为空时只接受同源页面
    pub cors_origins: Vec<String>,
}

impl AppSettings {
    /// 从环境变量读取设置
    pub fn from_env() -> Result<Self, SettingsError> {
        let production = env_trimmed("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let admin_password =
            env_trimmed("APP_PASS").unwrap_or_else(|| DEFAULT_ADMIN_PASS.to_string());
        if production && admin_password == DEFAULT_ADMIN_PASS {
            return Err(SettingsError::InsecureAdminPassword);
        }

        let base_dir = data_root();
        let settings = Self {
            db_path: get_default_db_path(),
            host: env_trimmed("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env_parsed("PORT")?.unwrap_or(DEFAULT_PORT),
            admin_username: env_trimmed("APP_USER")
                .unwrap_or_else(|| DEFAULT_ADMIN_USER.to_string()),
            admin_password,
            max_content_length: env_parsed("MAX_CONTENT_LENGTH")?
                .unwrap_or(DEFAULT_MAX_CONTENT_LENGTH),
            session_timeout_secs: env_parsed("SESSION_TIMEOUT")?
                .unwrap_or(DEFAULT_SESSION_TIMEOUT_SECS),
            upload_dir: env_trimmed("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| base_dir.join("uploads")),
            export_dir: env_trimmed("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| base_dir.join("exports")),
            backup_dir: env_trimmed("BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| base_dir.join("backups")),
            production,
            cors_origins: parse_origins(env_trimmed("CORS_ORIGINS").as_deref()),
        };
        Ok(settings)
    }

    /// 测试/嵌入场景：以指定数据库路径与工作目录构造
    pub fn for_paths(db_path: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            db_path: db_path.into(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            admin_username: DEFAULT_ADMIN_USER.to_string(),
            admin_password: DEFAULT_ADMIN_PASS.to_string(),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
            upload_dir: work_dir.join("uploads"),
            export_dir: work_dir.join("exports"),
            backup_dir: work_dir.join("backups"),
            production: false,
            cors_origins: Vec::new(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 判断文件扩展名是否允许上传
pub fn is_allowed_extension(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// 获取默认数据库路径
///
/// 优先级: TEAM_MGMT_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    if let Some(path) = env_trimmed("TEAM_MGMT_DB_PATH") {
        return path;
    }

    let dir = data_root();
    if std::fs::create_dir_all(&dir).is_ok() {
        return dir.join("team_management.db").to_string_lossy().to_string();
    }
    "./team_management.db".to_string()
}

/// 解析来源列表: 逗号分隔，去空白与末尾斜杠
fn parse_origins(raw: Option<&str>) -> Vec<String> {
    raw.map(|r| {
        r.split(',')
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

fn data_root() -> PathBuf {
    match dirs::data_dir() {
        Some(data_dir) => data_dir.join("team-management"),
        None => PathBuf::from("."),
    }
}

fn env_trimmed(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, SettingsError> {
    match env_trimmed(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| SettingsError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}
