use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    middleware::{RateLimiter, auth_middleware, log_errors, rate_limit},
    routes,
};

/// 构建全部接口。`rate_limiter` 只作用于公开的注册和登录接口
pub fn build(state: AppState, rate_limiter: Option<Arc<RateLimiter>>) -> Router {
    let mut public_routes = Router::new()
        .route("/users/register", post(routes::user::register))
        .route("/users/login", post(routes::user::login));

    if let Some(limiter) = rate_limiter {
        public_routes =
            public_routes.layer(axum::middleware::from_fn_with_state(limiter, rate_limit));
    }

    let protected_routes = Router::new()
        .route("/users/me", get(routes::user::me))
        .route(
            "/rooms",
            get(routes::room::list_rooms).post(routes::room::create_room),
        )
        .route("/rooms/{room_id}/join", post(routes::room::join_room))
        .route("/rooms/{room_id}/leave", post(routes::room::leave_room))
        .route(
            "/rooms/{room_id}/messages",
            get(routes::message::list_messages).post(routes::message::post_message),
        )
        .route(
            "/messages/{message_id}",
            get(routes::message::get_message).delete(routes::message::delete_message),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum::middleware::from_fn(log_errors))
        .with_state(state)
}
