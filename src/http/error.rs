// ==========================================
// 班组管理系统 - HTTP 响应封装
// ==========================================
// 成功: { "success": true, "data": ... }
// 失败: { "success": false, "error": 错误码, "message": 提示 }
// 5xx 仅记录日志，返回通用提示
// ==========================================

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::api::error::ApiError;
use crate::i18n::t;

/// 成功响应体
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        data,
    })
}

pub type HttpResult<T> = Result<Json<Success<T>>, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidInput(_)
            | ApiError::ValidationError(_)
            | ApiError::ImportError(_)
            | ApiError::BusinessRuleViolation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::InternalError(_)
            | ApiError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(code = self.code(), "请求处理失败: {}", self);
            t("http.internal_error")
        } else {
            match &self {
                ApiError::Unauthorized(msg) | ApiError::PermissionDenied(msg) => msg.clone(),
                other => other.to_string(),
            }
        };
        let body = json!({
            "success": false,
            "error": self.code(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}
