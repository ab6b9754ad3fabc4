// ==========================================
// 班组管理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口，屏蔽数据库细节
// 约束: 所有查询使用参数化，防止 SQL 注入
// ==========================================

pub mod algorithm_config_repo;
pub mod department_repo;
pub mod employee_repo;
pub mod error;
pub mod import_log_repo;
pub mod performance_repo;
pub mod safety_repo;
pub mod training_repo;
pub mod user_repo;

// 重导出核心仓储
pub use algorithm_config_repo::AlgorithmConfigRepository;
pub use department_repo::DepartmentRepository;
pub use employee_repo::EmployeeRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use import_log_repo::ImportLogRepository;
pub use performance_repo::{PerformanceRepository, PerformanceUpsert};
pub use safety_repo::SafetyRepository;
pub use training_repo::TrainingRepository;
pub use user_repo::UserRepository;
