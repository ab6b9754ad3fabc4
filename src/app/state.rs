// ==========================================
// 班组管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 所有仓储共享同一个 SQLite 连接
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{
    AlgorithmConfigApi, AnalyticsApi, AuthApi, BackupApi, DepartmentApi, ImportApi,
    PerformanceApi, PersonnelApi, SafetyApi, SessionStore, TrainingApi,
};
use crate::config::AppSettings;
use crate::repository::{
    AlgorithmConfigRepository, DepartmentRepository, EmployeeRepository, ImportLogRepository,
    PerformanceRepository, SafetyRepository, TrainingRepository, UserRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源，作为 axum 路由的全局状态
pub struct AppState {
    /// 进程级设置
    pub settings: AppSettings,

    /// 会话存储
    pub sessions: Arc<SessionStore>,

    /// 认证与用户管理API
    pub auth_api: Arc<AuthApi>,

    /// 部门API
    pub department_api: Arc<DepartmentApi>,

    /// 人员档案API
    pub personnel_api: Arc<PersonnelApi>,

    /// 绩效API
    pub performance_api: Arc<PerformanceApi>,

    /// 培训API
    pub training_api: Arc<TrainingApi>,

    /// 安全检查API
    pub safety_api: Arc<SafetyApi>,

    /// 算法配置API
    pub config_api: Arc<AlgorithmConfigApi>,

    /// 综合分析API
    pub analytics_api: Arc<AnalyticsApi>,

    /// 导入与导入日志API
    pub import_api: Arc<ImportApi>,

    /// 备份API
    pub backup_api: Arc<BackupApi>,
}

impl AppState {
    /// 打开数据库、建表并写入基础数据后创建AppState
    ///
    /// # 参数
    /// - settings: 进程级设置（数据库路径、管理员账号、备份目录等）
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(settings: AppSettings) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", settings.db_path);

        let conn = crate::db::open_sqlite_connection(&settings.db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        Self::prepare(&conn, &settings)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn)), settings))
    }

    /// 建表 + 基础数据
    pub fn prepare(conn: &Connection, settings: &AppSettings) -> Result<(), String> {
        crate::db::init_schema(conn).map_err(|e| format!("数据库初始化失败: {}", e))?;
        crate::db::bootstrap(conn, &settings.admin_username, &settings.admin_password)
            .map_err(|e| format!("基础数据初始化失败: {}", e))?;
        Ok(())
    }

    /// 基于已初始化的共享连接组装全部API
    pub fn from_connection(conn: Arc<Mutex<Connection>>, settings: AppSettings) -> Self {
        // ==========================================
        // 初始化Repository层
        // ==========================================
        let department_repo = Arc::new(DepartmentRepository::from_connection(conn.clone()));
        let user_repo = Arc::new(UserRepository::from_connection(conn.clone()));
        let employee_repo = Arc::new(EmployeeRepository::from_connection(conn.clone()));
        let performance_repo = Arc::new(PerformanceRepository::from_connection(conn.clone()));
        let training_repo = Arc::new(TrainingRepository::from_connection(conn.clone()));
        let safety_repo = Arc::new(SafetyRepository::from_connection(conn.clone()));
        let config_repo = Arc::new(AlgorithmConfigRepository::from_connection(conn.clone()));
        let import_log_repo = Arc::new(ImportLogRepository::from_connection(conn.clone()));

        // ==========================================
        // 初始化API层
        // ==========================================
        let sessions = Arc::new(SessionStore::new(settings.session_timeout_secs));
        let auth_api = Arc::new(AuthApi::new(
            user_repo.clone(),
            department_repo.clone(),
            sessions.clone(),
        ));
        let department_api = Arc::new(DepartmentApi::new(
            department_repo.clone(),
            employee_repo.clone(),
            user_repo,
        ));
        let import_api = Arc::new(ImportApi::new(import_log_repo, department_repo.clone()));
        let config_api = Arc::new(AlgorithmConfigApi::new(config_repo));
        let personnel_api = Arc::new(PersonnelApi::new(
            employee_repo.clone(),
            department_repo.clone(),
            import_api.clone(),
        ));
        let performance_api = Arc::new(PerformanceApi::new(
            performance_repo.clone(),
            employee_repo.clone(),
            department_repo.clone(),
            config_api.clone(),
            import_api.clone(),
        ));
        let training_api = Arc::new(TrainingApi::new(
            training_repo.clone(),
            employee_repo.clone(),
            department_repo.clone(),
            import_api.clone(),
        ));
        let safety_api = Arc::new(SafetyApi::new(
            safety_repo.clone(),
            employee_repo.clone(),
            department_repo.clone(),
            import_api.clone(),
        ));
        let analytics_api = Arc::new(AnalyticsApi::new(
            employee_repo,
            department_repo,
            performance_repo,
            training_repo,
            safety_repo,
            config_api.clone(),
        ));
        let backup_api = Arc::new(BackupApi::new(conn, settings.backup_dir.clone()));

        tracing::info!("AppState初始化完成");

        Self {
            settings,
            sessions,
            auth_api,
            department_api,
            personnel_api,
            performance_api,
            training_api,
            safety_api,
            config_api,
            analytics_api,
            import_api,
            backup_api,
        }
    }
}
