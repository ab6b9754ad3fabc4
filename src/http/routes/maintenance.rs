// ==========================================
// 班组管理系统 - 导入日志与备份路由
// ==========================================

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::BackupInfo;
use crate::app::AppState;
use crate::domain::import_log::{ImportLog, ImportLogFilter};
use crate::http::error::{ok, HttpResult};
use crate::http::extractors::CurrentUser;
use crate::http::routes::blocking;

#[derive(Debug, Default, Deserialize)]
pub struct BackupRequest {
    #[serde(default)]
    pub description: Option<String>,
}

async fn import_logs(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<ImportLogFilter>,
) -> HttpResult<Vec<ImportLog>> {
    Ok(ok(blocking(move || state.import_api.list_logs(&user, &filter)).await?))
}

async fn list_backups(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> HttpResult<Vec<BackupInfo>> {
    Ok(ok(blocking(move || state.backup_api.list_backups(&user)).await?))
}

async fn create_backup(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    body: Option<Json<BackupRequest>>,
) -> HttpResult<BackupInfo> {
    let description = body.and_then(|Json(b)| b.description);
    let info = blocking(move || {
        state
            .backup_api
            .create_backup(&user, description.as_deref())
    })
    .await?;
    Ok(ok(info))
}

async fn restore_backup(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(name): Path<String>,
) -> HttpResult<()> {
    blocking(move || state.backup_api.restore_backup(&user, &name)).await?;
    Ok(ok(()))
}

async fn delete_backup(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(name): Path<String>,
) -> HttpResult<()> {
    blocking(move || state.backup_api.delete_backup(&user, &name)).await?;
    Ok(ok(()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/import-logs", get(import_logs))
        .route("/backups", get(list_backups).post(create_backup))
        .route("/backups/{name}", delete(delete_backup))
        .route("/backups/{name}/restore", post(restore_backup))
}
