use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::AppError,
    middleware::AuthUser,
    result::{ApiResponse, success_to_api_response},
    store::{Room, RoomId},
};

use super::model::{CreateRoomRequest, MembershipResponse};

#[axum::debug_handler]
pub async fn create_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Room>>), AppError> {
    let name = req.validated_name().map_err(AppError::Validation)?;
    let room = state.store.create_room(name, auth.user_id).await?;
    tracing::info!(room_id = room.id, owner_id = auth.user_id, "Created room");
    Ok((StatusCode::CREATED, success_to_api_response(room)))
}

#[axum::debug_handler]
pub async fn list_rooms(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Room>>>, AppError> {
    let rooms = state.store.list_rooms().await?;
    Ok(success_to_api_response(rooms))
}

#[axum::debug_handler]
pub async fn join_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(room_id): Path<RoomId>,
) -> Result<Json<ApiResponse<MembershipResponse>>, AppError> {
    // 房间不存在与无权限返回相同的错误
    if state.store.find_room(room_id).await?.is_none() {
        tracing::debug!(user_id = auth.user_id, room_id, "Join denied: room not found");
        return Err(AppError::Forbidden);
    }

    state.store.join_room(room_id, auth.user_id).await?;
    Ok(success_to_api_response(MembershipResponse {
        room_id,
        joined: true,
    }))
}

#[axum::debug_handler]
pub async fn leave_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(room_id): Path<RoomId>,
) -> Result<Json<ApiResponse<MembershipResponse>>, AppError> {
    if !state.store.leave_room(room_id, auth.user_id).await? {
        tracing::debug!(user_id = auth.user_id, room_id, "Leave denied: not a member");
        return Err(AppError::Forbidden);
    }

    Ok(success_to_api_response(MembershipResponse {
        room_id,
        joined: false,
    }))
}
