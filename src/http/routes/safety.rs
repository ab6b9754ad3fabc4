// ==========================================
// 班组管理系统 - 安全检查路由
// ==========================================

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};

use crate::api::ImportApiResponse;
use crate::app::AppState;
use crate::domain::safety::{SafetyFilter, SafetyInput, SafetyRecord, SafetyStats};
use crate::http::error::{ok, HttpResult};
use crate::http::extractors::{CurrentUser, Upload};
use crate::http::routes::blocking;

async fn list_safety(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<SafetyFilter>,
) -> HttpResult<Vec<SafetyRecord>> {
    Ok(ok(blocking(move || state.safety_api.list_safety(&user, &filter)).await?))
}

async fn create_safety(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<SafetyInput>,
) -> HttpResult<i64> {
    Ok(ok(blocking(move || state.safety_api.create_safety(&user, input)).await?))
}

async fn update_safety(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<SafetyInput>,
) -> HttpResult<()> {
    blocking(move || state.safety_api.update_safety(&user, id, input)).await?;
    Ok(ok(()))
}

async fn delete_safety(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> HttpResult<()> {
    blocking(move || state.safety_api.delete_safety(&user, id)).await?;
    Ok(ok(()))
}

async fn import_safety(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    upload: Upload,
) -> HttpResult<ImportApiResponse> {
    let result = blocking(move || {
        state
            .safety_api
            .import_safety(&user, &upload.file_name, &upload.bytes)
    })
    .await?;
    Ok(ok(result))
}

async fn safety_stats(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<SafetyFilter>,
) -> HttpResult<SafetyStats> {
    Ok(ok(blocking(move || state.safety_api.safety_stats(&user, &filter)).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/safety", get(list_safety).post(create_safety))
        .route("/safety/{id}", put(update_safety).delete(delete_safety))
        .route("/safety/import", post(import_safety))
        .route("/safety/stats", get(safety_stats))
}
