use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::{Action, Decision, Resource},
    error::AppError,
    middleware::AuthUser,
    result::{ApiResponse, success_to_api_response},
    store::{Message, MessageId, RoomId},
};

use super::model::{ListMessagesQuery, PostMessageRequest};

async fn require(
    state: &AppState,
    auth: AuthUser,
    resource: Resource,
    action: Action,
) -> Result<(), AppError> {
    match state.guard.authorize(auth.user_id, resource, action).await? {
        Decision::Permitted => Ok(()),
        Decision::Denied => Err(AppError::Forbidden),
    }
}

#[axum::debug_handler]
pub async fn post_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(room_id): Path<RoomId>,
    Json(req): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Message>>), AppError> {
    req.validate().map_err(AppError::Validation)?;
    require(&state, auth, Resource::Room(room_id), Action::Write).await?;

    let message = state
        .store
        .create_message(room_id, auth.user_id, &req.content)
        .await?;
    Ok((StatusCode::CREATED, success_to_api_response(message)))
}

#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(room_id): Path<RoomId>,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<ApiResponse<Vec<Message>>>, AppError> {
    require(&state, auth, Resource::Room(room_id), Action::Read).await?;

    let messages = state
        .store
        .list_messages(room_id, query.before, query.limit())
        .await?;
    Ok(success_to_api_response(messages))
}

#[axum::debug_handler]
pub async fn get_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(message_id): Path<MessageId>,
) -> Result<Json<ApiResponse<Message>>, AppError> {
    require(&state, auth, Resource::Message(message_id), Action::Read).await?;

    // 授权通过后消息仍可能刚被删除，按拒绝处理
    let message = state
        .store
        .find_message(message_id)
        .await?
        .ok_or(AppError::Forbidden)?;
    Ok(success_to_api_response(message))
}

#[axum::debug_handler]
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(message_id): Path<MessageId>,
) -> Result<StatusCode, AppError> {
    require(&state, auth, Resource::Message(message_id), Action::Write).await?;

    if !state.store.delete_message(message_id).await? {
        return Err(AppError::Forbidden);
    }
    tracing::info!(message_id, user_id = auth.user_id, "Deleted message");
    Ok(StatusCode::NO_CONTENT)
}
