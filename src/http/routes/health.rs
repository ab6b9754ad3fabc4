// ==========================================
// 班组管理系统 - 健康检查
// ==========================================

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::http::error::{ok, Success};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub app: &'static str,
    pub version: &'static str,
}

/// GET /health - 无需登录，与其它接口同为 { success, data }
async fn health() -> Json<Success<HealthResponse>> {
    ok(HealthResponse {
        status: "ok",
        app: crate::APP_NAME,
        version: crate::VERSION,
    })
}

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_returns_ok() {
        let Json(body) = health().await;
        assert!(body.success);
        assert_eq!(body.data.status, "ok");
        assert_eq!(body.data.version, env!("CARGO_PKG_VERSION"));
    }
}
