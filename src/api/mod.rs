// ==========================================
// 班组管理系统 - API 层
// ==========================================
// 职责: 业务 API，供 HTTP 路由调用
// 约定: 每个方法先解析当前用户的访问范围，再读写仓储
// ==========================================

pub mod error;
pub mod session;
pub mod auth_api;
pub mod department_api;
pub mod import_api;
pub mod personnel_api;
pub mod performance_api;
pub mod training_api;
pub mod safety_api;
pub mod algorithm_config_api;
pub mod analytics_api;
pub mod backup_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use session::SessionStore;
pub use auth_api::{AuthApi, LoginResponse};
pub use department_api::DepartmentApi;
pub use import_api::{ImportApi, ImportApiResponse};
pub use personnel_api::{BatchDeleteResult, PersonnelApi, PersonnelOverview};
pub use performance_api::PerformanceApi;
pub use training_api::TrainingApi;
pub use safety_api::SafetyApi;
pub use algorithm_config_api::{AlgorithmConfigApi, ValidationOutcome};
pub use analytics_api::{AnalysisPeriod, AnalyticsApi, EmployeeProfile, KeyPersonnelEntry, NineGridReport};
pub use backup_api::{BackupApi, BackupInfo};
