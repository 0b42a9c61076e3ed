use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::{TokenError, VerifyError};
use crate::result::{error_codes, error_to_api_response};
use crate::store::StoreError;

/// 对外错误。认证失败的各种细节原因只写日志，不进入响应
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("forbidden")]
    Forbidden,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("username already registered")]
    UsernameTaken,

    #[error("room name already exists")]
    RoomNameTaken,

    #[error("rate limited for {0}s")]
    RateLimited(u64),

    #[error("storage unavailable")]
    ServiceUnavailable,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UsernameTaken => AppError::UsernameTaken,
            StoreError::RoomNameTaken => AppError::RoomNameTaken,
            StoreError::Database(e) => {
                tracing::error!("Storage failure: {}", e);
                AppError::ServiceUnavailable
            }
        }
    }
}

impl From<VerifyError> for AppError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::Store(e) => e.into(),
            VerifyError::Task(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                error_codes::AUTH_FAILED,
                "未授权访问".to_string(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                error_codes::AUTH_FAILED,
                "用户名或密码错误".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                error_codes::PERMISSION_DENIED,
                "无权访问该资源".to_string(),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                error_codes::VALIDATION_ERROR,
                msg.clone(),
            ),
            AppError::UsernameTaken => (
                StatusCode::CONFLICT,
                error_codes::USER_EXISTS,
                "用户已存在".to_string(),
            ),
            AppError::RoomNameTaken => (
                StatusCode::CONFLICT,
                error_codes::ROOM_EXISTS,
                "房间已存在".to_string(),
            ),
            AppError::RateLimited(window) => (
                StatusCode::TOO_MANY_REQUESTS,
                error_codes::RATE_LIMIT,
                format!("请求过于频繁，请在{}秒后重试", window),
            ),
            AppError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                error_codes::SERVICE_UNAVAILABLE,
                "服务暂不可用".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "内部服务器错误".to_string(),
            ),
        };

        let mut response =
            (status, error_to_api_response::<()>(code, error_message)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        if let AppError::Internal(detail) = &self {
            tracing::error!("Internal error: {}", detail);
        }
        response
    }
}
