// ==========================================
// 班组管理系统 - 路由
// ==========================================
// 按资源分文件，统一挂载到 /api 下
// ==========================================

pub mod analytics;
pub mod auth;
pub mod departments;
pub mod health;
pub mod maintenance;
pub mod performance;
pub mod personnel;
pub mod safety;
pub mod system_config;
pub mod training;

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};

use crate::api::error::{ApiError, ApiResult};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// 在阻塞线程池中执行同步 API（数据库访问、口令哈希、导入导出）
pub(crate) async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?
}

/// xlsx 下载响应
pub(crate) fn xlsx_download(file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (CONTENT_TYPE, XLSX_MIME.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response()
}
