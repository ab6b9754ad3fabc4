// ==========================================
// 班组管理系统 - 配置层
// ==========================================
// 职责:
// - 进程级设置（环境变量）
// - 评分算法配置（强类型视图 / 内置预设 / 校验）
// 存储: algorithm_presets / algorithm_active_config 表
// ==========================================

pub mod algorithm;
pub mod presets;
pub mod settings;
pub mod validator;

// 重导出核心配置类型
pub use algorithm::AlgorithmConfig;
pub use presets::{builtin_presets, BuiltinPreset};
pub use settings::{AppSettings, SettingsError};
pub use validator::validate_config;
