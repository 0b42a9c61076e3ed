use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{
    AppState,
    auth::{Verification, hash_password},
    error::AppError,
    middleware::AuthUser,
    result::{ApiResponse, success_to_api_response},
    store::User,
};

use super::model::{LoginRequest, RegisterRequest, TokenResponse};

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TokenResponse>>), AppError> {
    req.validate().map_err(AppError::Validation)?;

    let cost = state.verifier.cost();
    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

    let user = state.store.create_user(&req.username, &password_hash).await?;
    let token = state.tokens.issue(user.id, Utc::now())?;

    Ok((
        StatusCode::CREATED,
        success_to_api_response(TokenResponse::from(token)),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, AppError> {
    let user_id = match state.verifier.verify(&req.username, &req.password).await? {
        Verification::Authenticated(user_id) => user_id,
        Verification::Rejected => return Err(AppError::InvalidCredentials),
    };

    let token = state.tokens.issue(user_id, Utc::now())?;
    Ok(success_to_api_response(TokenResponse::from(token)))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = state
        .store
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(success_to_api_response(user))
}
