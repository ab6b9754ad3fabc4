// ==========================================
// 班组管理系统 - 应用层
// ==========================================
// 职责: 组装仓储与API，作为 HTTP 层的共享状态
// ==========================================

pub mod state;

pub use state::AppState;
