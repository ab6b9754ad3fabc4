// ==========================================
// 班组管理系统 - 部门路由
// ==========================================

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::app::AppState;
use crate::domain::department::{
    Department, DepartmentNode, DepartmentPatch, DepartmentSummary, NewDepartment,
};
use crate::http::error::{ok, HttpResult};
use crate::http::extractors::CurrentUser;
use crate::http::routes::blocking;

async fn list_departments(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> HttpResult<Vec<DepartmentSummary>> {
    Ok(ok(blocking(move || state.department_api.list_departments(&user)).await?))
}

async fn department_tree(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> HttpResult<Vec<DepartmentNode>> {
    Ok(ok(blocking(move || state.department_api.department_tree(&user)).await?))
}

async fn get_department(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> HttpResult<Department> {
    Ok(ok(blocking(move || state.department_api.get_department(&user, id)).await?))
}

async fn create_department(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<NewDepartment>,
) -> HttpResult<Department> {
    Ok(ok(blocking(move || state.department_api.create_department(&user, input)).await?))
}

async fn update_department(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(patch): Json<DepartmentPatch>,
) -> HttpResult<Department> {
    Ok(ok(blocking(move || state.department_api.update_department(&user, id, patch)).await?))
}

async fn delete_department(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> HttpResult<()> {
    blocking(move || state.department_api.delete_department(&user, id)).await?;
    Ok(ok(()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/departments", get(list_departments).post(create_department))
        .route("/departments/tree", get(department_tree))
        .route(
            "/departments/{id}",
            get(get_department)
                .put(update_department)
                .delete(delete_department),
        )
}
