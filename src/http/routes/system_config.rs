// ==========================================
// 班组管理系统 - 算法配置路由
// ==========================================

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ValidationOutcome;
use crate::app::AppState;
use crate::domain::algorithm::{ActiveConfigInfo, AlgorithmPreset, ConfigChangeLog, ConfigLogDetail};
use crate::engine::simulate::{SimulationResult, SimulationSample};
use crate::http::error::{ok, HttpResult};
use crate::http::extractors::CurrentUser;
use crate::http::routes::blocking;

#[derive(Serialize)]
pub struct CurrentConfigResponse {
    pub info: ActiveConfigInfo,
    pub config: Value,
}

#[derive(Deserialize)]
pub struct ApplyPresetRequest {
    pub preset_key: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize)]
pub struct UpdateConfigRequest {
    pub config: Value,
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize)]
pub struct UpdatePresetRequest {
    pub preset_key: String,
    pub config: Value,
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize)]
pub struct RollbackRequest {
    pub log_id: i64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Deserialize)]
pub struct SimulateRequest {
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub sample: SimulationSample,
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub config: Value,
}

#[derive(Deserialize)]
pub struct LogQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

async fn current(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
) -> HttpResult<CurrentConfigResponse> {
    let (info, config) = blocking(move || {
        let info = state.config_api.get_current_info()?;
        let config = state.config_api.get_active_config()?;
        Ok((info, config))
    })
    .await?;
    Ok(ok(CurrentConfigResponse { info, config }))
}

async fn presets(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
) -> HttpResult<Vec<AlgorithmPreset>> {
    Ok(ok(blocking(move || state.config_api.get_presets()).await?))
}

async fn apply_preset(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ApplyPresetRequest>,
) -> HttpResult<i64> {
    let result = blocking(move || {
        state.config_api.apply_preset(&user, &req.preset_key, &req.reason)
    })
    .await?;
    Ok(ok(result))
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpdateConfigRequest>,
) -> HttpResult<i64> {
    let result = blocking(move || {
        state.config_api.update_custom_config(&user, &req.config, &req.reason)
    })
    .await?;
    Ok(ok(result))
}

async fn update_preset(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpdatePresetRequest>,
) -> HttpResult<i64> {
    let result = blocking(move || {
        state.config_api.update_preset(&user, &req.preset_key, &req.config, &req.reason)
    })
    .await?;
    Ok(ok(result))
}

async fn rollback(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<RollbackRequest>,
) -> HttpResult<i64> {
    let result = blocking(move || {
        state.config_api.rollback_preset_update(&user, req.log_id, &req.reason)
    })
    .await?;
    Ok(ok(result))
}

async fn simulate(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Json(req): Json<SimulateRequest>,
) -> HttpResult<SimulationResult> {
    Ok(ok(blocking(move || state.config_api.simulate(req.config.as_ref(), &req.sample)).await?))
}

async fn validate(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Json(req): Json<ValidateRequest>,
) -> HttpResult<ValidationOutcome> {
    Ok(ok(state.config_api.validate(&req.config)))
}

async fn logs(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<LogQuery>,
) -> HttpResult<Vec<ConfigChangeLog>> {
    Ok(ok(blocking(move || state.config_api.get_logs(&user, q.limit, q.offset)).await?))
}

async fn log_detail(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> HttpResult<ConfigLogDetail> {
    Ok(ok(blocking(move || state.config_api.get_log_detail(&user, id)).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/system-config/current", get(current))
        .route("/system-config/presets", get(presets))
        .route("/system-config/apply", post(apply_preset))
        .route("/system-config/update", post(update_config))
        .route("/system-config/update-preset", post(update_preset))
        .route("/system-config/rollback", post(rollback))
        .route("/system-config/simulate", post(simulate))
        .route("/system-config/validate", post(validate))
        .route("/system-config/logs", get(logs))
        .route("/system-config/logs/{id}", get(log_detail))
}
