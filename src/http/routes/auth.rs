// ==========================================
// 班组管理系统 - 认证与用户管理路由
// ==========================================

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::LoginResponse;
use crate::app::AppState;
use crate::domain::user::{AuthUser, NewUser, User, UserPatch};
use crate::http::error::{ok, HttpResult};
use crate::http::extractors::{BearerToken, CurrentUser};
use crate::http::routes::blocking;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

/// POST /auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> HttpResult<LoginResponse> {
    let resp = blocking(move || state.auth_api.login(&req.username, &req.password)).await?;
    Ok(ok(resp))
}

/// POST /auth/logout
async fn logout(State(state): State<Arc<AppState>>, BearerToken(token): BearerToken) -> HttpResult<bool> {
    let removed = blocking(move || Ok(token.map_or(false, |t| state.auth_api.logout(&t)))).await?;
    Ok(ok(removed))
}

/// GET /auth/me
async fn me(CurrentUser(user): CurrentUser) -> HttpResult<AuthUser> {
    Ok(ok(user))
}

/// POST /auth/change-password
async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> HttpResult<()> {
    blocking(move || {
        state
            .auth_api
            .change_password(&user, &req.old_password, &req.new_password)
    })
    .await?;
    Ok(ok(()))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> HttpResult<Vec<User>> {
    Ok(ok(blocking(move || state.auth_api.list_users(&user)).await?))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<NewUser>,
) -> HttpResult<User> {
    Ok(ok(blocking(move || state.auth_api.create_user(&user, input)).await?))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(patch): Json<UserPatch>,
) -> HttpResult<User> {
    Ok(ok(blocking(move || state.auth_api.update_user(&user, id, patch)).await?))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> HttpResult<()> {
    blocking(move || state.auth_api.delete_user(&user, id)).await?;
    Ok(ok(()))
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<ResetPasswordRequest>,
) -> HttpResult<()> {
    blocking(move || state.auth_api.reset_password(&user, id, &req.new_password)).await?;
    Ok(ok(()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/change-password", post(change_password))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", put(update_user).delete(delete_user))
        .route("/users/{id}/reset-password", post(reset_password))
}
