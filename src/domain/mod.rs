// ==========================================
// 班组管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型与请求载荷
// 红线: 不含数据访问逻辑，不含评分逻辑
// ==========================================

pub mod algorithm;
pub mod department;
pub mod employee;
pub mod import_log;
pub mod performance;
pub mod safety;
pub mod training;
pub mod types;
pub mod user;

// 重导出核心类型
pub use algorithm::{
    ActiveConfig, ActiveConfigInfo, AlgorithmPreset, ConfigChangeLog, ConfigDiff,
    ConfigLogDetail, NewConfigLog,
};
pub use department::{
    Department, DepartmentNode, DepartmentPatch, DepartmentSummary, NewDepartment,
};
pub use employee::{Employee, EmployeeInput, PersonnelField, PersonnelFilter, PersonnelView};
pub use import_log::{ImportLog, ImportLogFilter, NewImportLog};
pub use performance::{
    GradeOption, MonthGrade, PerformanceFilter, PerformanceInput, PerformanceRecord,
    QuarterGradeRow, QuarterOverride,
};
pub use safety::{
    MonthCount, NewSafetyRecord, PersonCount, SafetyFilter, SafetyInput, SafetyRecord,
    SafetyStats,
};
pub use training::{
    NewTrainingRecord, ProjectCount, TrainingCategory, TrainingFilter, TrainingInput,
    TrainingProject, TrainingRecord, TrainingStats,
};
pub use types::{ConfigAction, ImportModule, RiskLevel, StatusColor, UserRole};
pub use user::{AuthUser, NewUser, User, UserPatch};
