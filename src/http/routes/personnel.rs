// ==========================================
// 班组管理系统 - 人员档案路由
// ==========================================

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::{BatchDeleteResult, ImportApiResponse, PersonnelOverview};
use crate::app::AppState;
use crate::domain::employee::{EmployeeInput, PersonnelFilter, PersonnelView};
use crate::engine::personnel_stats::PersonnelAnalytics;
use crate::http::error::{ok, HttpResult};
use crate::http::extractors::{CurrentUser, Upload};
use crate::http::routes::{blocking, xlsx_download};

#[derive(Deserialize)]
pub struct BatchDeleteRequest {
    pub emp_nos: Vec<String>,
}

#[derive(Deserialize)]
pub struct FieldUpdateRequest {
    pub field: String,
    #[serde(default)]
    pub value: Option<String>,
}

async fn list_personnel(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<PersonnelFilter>,
) -> HttpResult<Vec<PersonnelView>> {
    Ok(ok(blocking(move || state.personnel_api.list_personnel(&user, &filter)).await?))
}

async fn personnel_overview(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<PersonnelFilter>,
) -> HttpResult<PersonnelOverview> {
    Ok(ok(blocking(move || state.personnel_api.personnel_overview(&user, &filter)).await?))
}

/// GET /personnel/analytics - 司机队伍分析看板
async fn personnel_analytics(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> HttpResult<PersonnelAnalytics> {
    Ok(ok(blocking(move || state.personnel_api.personnel_analytics(&user)).await?))
}

/// POST /personnel - 新增或更新（返回是否新建）
async fn upsert_personnel(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<EmployeeInput>,
) -> HttpResult<bool> {
    Ok(ok(blocking(move || state.personnel_api.upsert_personnel(&user, input)).await?))
}

async fn get_personnel(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(emp_no): Path<String>,
) -> HttpResult<PersonnelView> {
    Ok(ok(blocking(move || state.personnel_api.get_personnel(&user, &emp_no)).await?))
}

async fn delete_personnel(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(emp_no): Path<String>,
) -> HttpResult<()> {
    blocking(move || state.personnel_api.delete_personnel(&user, &emp_no)).await?;
    Ok(ok(()))
}

async fn update_field(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(emp_no): Path<String>,
    Json(req): Json<FieldUpdateRequest>,
) -> HttpResult<()> {
    blocking(move || {
        state.personnel_api.update_personnel_field(&user, &emp_no, &req.field, req.value.as_deref())
    })
    .await?;
    Ok(ok(()))
}

async fn batch_delete(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<BatchDeleteRequest>,
) -> HttpResult<BatchDeleteResult> {
    Ok(ok(blocking(move || state.personnel_api.batch_delete_personnel(&user, &req.emp_nos)).await?))
}

async fn import_personnel(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    upload: Upload,
) -> HttpResult<ImportApiResponse> {
    let result = blocking(move || {
        state
            .personnel_api
            .import_personnel(&user, &upload.file_name, &upload.bytes)
    })
    .await?;
    Ok(ok(result))
}

async fn template(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
) -> Result<Response, ApiError> {
    let bytes = blocking(move || state.personnel_api.personnel_template()).await?;
    Ok(xlsx_download("personnel_template.xlsx", bytes))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/personnel", get(list_personnel).post(upsert_personnel))
        .route("/personnel/overview", get(personnel_overview))
        .route("/personnel/analytics", get(personnel_analytics))
        .route("/personnel/template", get(template))
        .route("/personnel/import", post(import_personnel))
        .route("/personnel/batch-delete", post(batch_delete))
        .route(
            "/personnel/{emp_no}",
            get(get_personnel).delete(delete_personnel),
        )
        .route("/personnel/{emp_no}/field", patch(update_field))
}
