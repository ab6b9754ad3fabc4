// ==========================================
// 班组管理系统 - 综合分析路由
// ==========================================

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::{EmployeeProfile, KeyPersonnelEntry, NineGridReport};
use crate::app::AppState;
use crate::engine::month::YearMonth;
use crate::http::error::{ok, HttpResult};
use crate::http::extractors::CurrentUser;
use crate::http::routes::{blocking, xlsx_download};

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    #[serde(default)]
    pub start_month: Option<YearMonth>,
    #[serde(default)]
    pub end_month: Option<YearMonth>,
    #[serde(default)]
    pub department_id: Option<i64>,
}

async fn profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(emp_no): Path<String>,
    Query(q): Query<PeriodQuery>,
) -> HttpResult<EmployeeProfile> {
    let result = blocking(move || {
        state
            .analytics_api
            .employee_profile(&user, &emp_no, q.start_month, q.end_month)
    })
    .await?;
    Ok(ok(result))
}

async fn nine_grid(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<PeriodQuery>,
) -> HttpResult<NineGridReport> {
    let result = blocking(move || {
        state
            .analytics_api
            .nine_grid(&user, q.start_month, q.end_month, q.department_id)
    })
    .await?;
    Ok(ok(result))
}

async fn export_nine_grid(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<PeriodQuery>,
) -> Result<Response, ApiError> {
    let bytes = blocking(move || {
        state
            .analytics_api
            .export_nine_grid(&user, q.start_month, q.end_month, q.department_id)
    })
    .await?;
    Ok(xlsx_download("nine_grid.xlsx", bytes))
}

async fn key_personnel(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<PeriodQuery>,
) -> HttpResult<Vec<KeyPersonnelEntry>> {
    let result = blocking(move || {
        state
            .analytics_api
            .key_personnel(&user, q.start_month, q.end_month)
    })
    .await?;
    Ok(ok(result))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analytics/profile/{emp_no}", get(profile))
        .route("/analytics/nine-grid", get(nine_grid))
        .route("/analytics/nine-grid/export", get(export_nine_grid))
        .route("/analytics/key-personnel", get(key_personnel))
}
