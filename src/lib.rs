// ==========================================
// 班组管理系统 - 核心库
// ==========================================
// 业务: 人员档案 / 绩效 / 培训 / 安全检查 / 部门与权限
// 技术栈: axum + Rust + SQLite
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 评分与权限规则
pub mod engine;

// 导入层 - Excel/CSV 解析与导出
pub mod importer;

// 配置层 - 进程设置与算法配置
pub mod config;

// 数据库基础设施（连接初始化/建表/基础数据）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// 密码哈希
pub mod security;

// API 层 - 业务接口
pub mod api;

// 应用层 - 共享状态
pub mod app;

// HTTP 层
pub mod http;

// ==========================================
// 重导出核心类型
// ==========================================

pub use api::{ApiError, ApiResult};
pub use app::AppState;
pub use config::{AlgorithmConfig, AppSettings};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "班组管理系统";
