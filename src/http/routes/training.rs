// ==========================================
// 班组管理系统 - 培训路由
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
use crate::domain::training::{
    TrainingCategory, TrainingFilter, TrainingInput, TrainingProject, TrainingRecord,
    TrainingStats,
};
use crate::http::error::{ok, HttpResult};
use crate::http::extractors::{CurrentUser, Upload};
use crate::http::routes::blocking;

#[derive(Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct ProjectRequest {
    pub name: String,
    #[serde(default)]
    pub category_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct ProjectQuery {
    #[serde(default)]
    pub category_id: Option<i64>,
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
) -> HttpResult<Vec<TrainingCategory>> {
    Ok(ok(blocking(move || state.training_api.list_categories()).await?))
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<NameRequest>,
) -> HttpResult<i64> {
    Ok(ok(blocking(move || state.training_api.create_category(&user, &req.name)).await?))
}

async fn list_projects(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Query(q): Query<ProjectQuery>,
) -> HttpResult<Vec<TrainingProject>> {
    Ok(ok(blocking(move || state.training_api.list_projects(q.category_id)).await?))
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ProjectRequest>,
) -> HttpResult<i64> {
    let result = blocking(move || {
        state.training_api.create_project(&user, &req.name, req.category_id)
    })
    .await?;
    Ok(ok(result))
}

async fn delete_project(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> HttpResult<()> {
    blocking(move || state.training_api.delete_project(&user, id)).await?;
    Ok(ok(()))
}

async fn list_training(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<TrainingFilter>,
) -> HttpResult<Vec<TrainingRecord>> {
    Ok(ok(blocking(move || state.training_api.list_training(&user, &filter)).await?))
}

async fn create_training(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<TrainingInput>,
) -> HttpResult<i64> {
    Ok(ok(blocking(move || state.training_api.create_training(&user, input)).await?))
}

/// POST /training/{id}/retake - 为不合格记录补录补考
async fn create_retake(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<TrainingInput>,
) -> HttpResult<i64> {
    Ok(ok(blocking(move || state.training_api.create_retake(&user, id, input)).await?))
}

async fn delete_training(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> HttpResult<()> {
    blocking(move || state.training_api.delete_training(&user, id)).await?;
    Ok(ok(()))
}

async fn import_training(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    upload: Upload,
) -> HttpResult<ImportApiResponse> {
    let result = blocking(move || {
        state
            .training_api
            .import_training(&user, &upload.file_name, &upload.bytes)
    })
    .await?;
    Ok(ok(result))
}

async fn training_stats(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<TrainingFilter>,
) -> HttpResult<TrainingStats> {
    Ok(ok(blocking(move || state.training_api.training_stats(&user, &filter)).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/training", get(list_training).post(create_training))
        .route("/training/{id}", delete(delete_training))
        .route("/training/{id}/retake", post(create_retake))
        .route("/training/import", post(import_training))
        .route("/training/stats", get(training_stats))
        .route("/training/categories", get(list_categories).post(create_category))
        .route("/training/projects", get(list_projects).post(create_project))
        .route("/training/projects/{id}", delete(delete_project))
}
