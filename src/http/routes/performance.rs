// ==========================================
// 班组管理系统 - 绩效路由
// ==========================================

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::ImportApiResponse;
use crate::app::AppState;
use crate::domain::performance::{
    GradeOption, PerformanceFilter, PerformanceInput, PerformanceRecord, QuarterGradeRow,
};
use crate::http::error::{ok, HttpResult};
use crate::http::extractors::{CurrentUser, Upload};
use crate::http::routes::blocking;

#[derive(Deserialize)]
pub struct QuarterQuery {
    pub year: i32,
    pub quarter: u32,
    #[serde(default)]
    pub department_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct OverrideKey {
    pub emp_no: String,
    pub year: i32,
    pub quarter: u32,
}

#[derive(Deserialize)]
pub struct OverrideRequest {
    pub emp_no: String,
    pub year: i32,
    pub quarter: u32,
    pub grade: String,
}

async fn list_performance(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<PerformanceFilter>,
) -> HttpResult<Vec<PerformanceRecord>> {
    Ok(ok(blocking(move || state.performance_api.list_performance(&user, &filter)).await?))
}

async fn upsert_performance(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<PerformanceInput>,
) -> HttpResult<()> {
    blocking(move || state.performance_api.upsert_performance(&user, input)).await?;
    Ok(ok(()))
}

async fn delete_performance(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> HttpResult<()> {
    blocking(move || state.performance_api.delete_performance(&user, id)).await?;
    Ok(ok(()))
}

async fn import_performance(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    upload: Upload,
) -> HttpResult<ImportApiResponse> {
    let result = blocking(move || {
        state
            .performance_api
            .import_performance(&user, &upload.file_name, &upload.bytes)
    })
    .await?;
    Ok(ok(result))
}

async fn grade_options(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
) -> HttpResult<Vec<GradeOption>> {
    Ok(ok(blocking(move || state.performance_api.list_grade_options()).await?))
}

async fn quarter_grades(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<QuarterQuery>,
) -> HttpResult<Vec<QuarterGradeRow>> {
    let result = blocking(move || {
        state.performance_api.list_quarter_grades(&user, q.year, q.quarter, q.department_id)
    })
    .await?;
    Ok(ok(result))
}

/// POST /performance/quarters/override - 返回规范化后的等级
async fn set_override(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<OverrideRequest>,
) -> HttpResult<String> {
    let result = blocking(move || {
        state.performance_api.set_quarter_override(&user, &req.emp_no, req.year, req.quarter, &req.grade)
    })
    .await?;
    Ok(ok(result))
}

async fn clear_override(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(key): Query<OverrideKey>,
) -> HttpResult<bool> {
    let result = blocking(move || {
        state.performance_api.clear_quarter_override(&user, &key.emp_no, key.year, key.quarter)
    })
    .await?;
    Ok(ok(result))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/performance", get(list_performance).post(upsert_performance))
        .route("/performance/{id}", delete(delete_performance))
        .route("/performance/import", post(import_performance))
        .route("/performance/grade-options", get(grade_options))
        .route("/performance/quarters", get(quarter_grades))
        .route(
            "/performance/quarters/override",
            post(set_override).delete(clear_override),
        )
}
