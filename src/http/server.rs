// ==========================================
// 班组管理系统 - HTTP 服务
// ==========================================
// 路由统一挂载在 /api 下
// 中间件: 请求体上限、CORS（生产环境按 CORS_ORIGINS 白名单）、请求追踪、安全响应头
// 停止: Ctrl+C / SIGTERM 优雅退出
// ==========================================

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request};
use axum::http::header::{HeaderValue, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;
use crate::app::AppState;
use crate::config::AppSettings;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 组装全部路由
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(routes::health::router())
        .merge(routes::auth::router())
        .merge(routes::departments::router())
        .merge(routes::personnel::router())
        .merge(routes::performance::router())
        .merge(routes::training::router())
        .merge(routes::safety::router())
        .merge(routes::system_config::router())
        .merge(routes::analytics::router())
        .merge(routes::maintenance::router());

    let cors = cors_layer(&state.settings);

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(state.settings.max_content_length))
        .layer(middleware::from_fn(security_headers))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 开发环境放开跨域；生产环境只对 CORS_ORIGINS 中的来源返回 Access-Control-Allow-Origin，
/// 未配置时不返回该头，浏览器仅允许同源页面调用
fn cors_layer(settings: &AppSettings) -> CorsLayer {
    if !settings.production {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "CORS 来源格式错误，已忽略");
                None
            }
        })
        .collect();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn security_headers(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    resp
}

/// 启动服务并阻塞到收到停止信号
pub async fn run_server(state: Arc<AppState>) -> Result<(), ServerError> {
    let addr = state.settings.bind_address();
    let app = build_router(state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("服务监听于 {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("无法监听 Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("无法监听 SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("收到 Ctrl+C，开始停止服务"),
        _ = terminate => tracing::info!("收到 SIGTERM，开始停止服务"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN};
    use tower::ServiceExt;

    fn test_app() -> (tempfile::TempDir, Router) {
        app_with(|_| {})
    }

    fn app_with(adjust: impl FnOnce(&mut AppSettings)) -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("team.db");
        let mut settings = AppSettings::for_paths(db_path.to_string_lossy().to_string(), dir.path());
        adjust(&mut settings);
        let state = AppState::new(settings).unwrap();
        (dir, build_router(Arc::new(state)))
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method("OPTIONS")
            .uri("/api/personnel")
            .header(ORIGIN, origin)
            .header(ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_has_security_headers() {
        let (_dir, app) = test_app();
        let resp = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[X_FRAME_OPTIONS], "DENY");
        assert_eq!(resp.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
        let body = body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn production_cors_without_origins_is_same_origin_only() {
        let (_dir, app) = app_with(|s| s.production = true);
        let resp = app.oneshot(preflight("https://evil.example.com")).await.unwrap();
        assert!(resp.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn production_cors_allows_configured_origins() {
        let (_dir, app) = app_with(|s| {
            s.production = true;
            s.cors_origins = vec!["https://team.example.com".to_string()];
        });
        let resp = app
            .clone()
            .oneshot(preflight("https://team.example.com"))
            .await
            .unwrap();
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://team.example.com");

        let resp = app.oneshot(preflight("https://evil.example.com")).await.unwrap();
        assert!(resp.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn development_cors_is_permissive() {
        let (_dir, app) = test_app();
        let resp = app.oneshot(preflight("http://localhost:5173")).await.unwrap();
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn protected_route_requires_token() {
        let (_dir, app) = test_app();
        let resp = app
            .oneshot(Request::builder().uri("/api/personnel").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn login_then_me() {
        let (_dir, app) = test_app();
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"username":"admin","password":"admin123"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/me")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["data"]["username"], "admin");
    }
}
