use super::AppState;
use crate::context::OpContext;
use crate::error::{AccountError, Result};
use crate::models::{AccountPatch, PublicAccount};
use crate::security::AuthContext;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicAccount,
}

fn request_context(state: &AppState) -> OpContext {
    OpContext::with_timeout(state.request_timeout)
}

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AccountError::validation("body", rejection.body_text()))
}

fn issue_token(state: &AppState, account: &PublicAccount) -> Result<String> {
    state.authority.issue(&account.id.to_string()).map_err(|e| {
        error!(account_id = %account.id, error = %e, "Failed to issue token");
        AccountError::Internal("token signing failed".to_string())
    })
}

pub(super) async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let req = body(payload)?;
    let ctx = request_context(&state);

    let user = state
        .accounts
        .register(&ctx, &req.name, &req.email, &req.password)
        .await?;
    let token = issue_token(&state, &user)?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub(super) async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>> {
    let req = body(payload)?;
    let ctx = request_context(&state);

    let user = state
        .accounts
        .authenticate(&ctx, &req.email, &req.password)
        .await?;
    let token = issue_token(&state, &user)?;

    Ok(Json(AuthResponse { token, user }))
}

pub(super) async fn list_users(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
) -> Result<Json<Vec<PublicAccount>>> {
    let ctx = request_context(&state);
    Ok(Json(state.accounts.list(&ctx).await?))
}

pub(super) async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<PublicAccount>> {
    let id = auth.ensure_owner(&id)?;
    let ctx = request_context(&state);
    Ok(Json(state.accounts.get(&ctx, id).await?))
}

pub(super) async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<AccountPatch>, JsonRejection>,
) -> Result<Json<PublicAccount>> {
    let id = auth.ensure_owner(&id)?;
    let patch = body(payload)?;
    let ctx = request_context(&state);
    Ok(Json(state.accounts.update(&ctx, id, patch).await?))
}

pub(super) async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = auth.ensure_owner(&id)?;
    let ctx = request_context(&state);
    state.accounts.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
