use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use chrono::Utc;

use crate::{
    AppState,
    auth::Validation,
    error::AppError,
    store::UserId,
};

/// 通过令牌校验后的身份，由中间件放入请求扩展
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: UserId,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(bearer) = req.headers().typed_get::<Authorization<Bearer>>() else {
        tracing::debug!(path = %req.uri().path(), "Missing bearer token");
        return Err(AppError::Unauthorized);
    };

    let user_id = match state.tokens.validate(bearer.token(), Utc::now()) {
        Validation::Valid(user_id) => user_id,
        outcome => {
            tracing::info!(outcome = outcome.as_str(), "Token rejected");
            return Err(AppError::Unauthorized);
        }
    };

    // 令牌有效但用户已被删除
    if state.store.find_user_by_id(user_id).await?.is_none() {
        tracing::info!(user_id, outcome = "unknown_subject", "Token rejected");
        return Err(AppError::Unauthorized);
    }

    req.extensions_mut().insert(AuthUser { user_id });
    Ok(next.run(req).await)
}
