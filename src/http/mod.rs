// ==========================================
// 班组管理系统 - HTTP 层
// ==========================================
// 职责: 将 API 层以 JSON 接口对外暴露
// ==========================================

pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;

pub use server::{build_router, run_server, ServerError};
