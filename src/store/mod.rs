mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use thiserror::Error;

pub type UserId = i64;
pub type RoomId = i64;
pub type MessageId = i64;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already registered")]
    UsernameTaken,

    #[error("room name already exists")]
    RoomNameTaken,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// 持久化协作者：认证核心只通过这个接口读取用户与房间成员关系
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>, StoreError>;

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError>;

    async fn find_room_membership(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<bool, StoreError>;

    async fn find_room(&self, room_id: RoomId) -> Result<Option<Room>, StoreError>;

    async fn find_message(&self, message_id: MessageId) -> Result<Option<Message>, StoreError>;

    /// 创建房间，创建者同时成为成员
    async fn create_room(&self, name: &str, owner_id: UserId) -> Result<Room, StoreError>;

    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError>;

    /// 重复加入不报错
    async fn join_room(&self, room_id: RoomId, user_id: UserId) -> Result<(), StoreError>;

    /// 返回用户之前是否在房间中
    async fn leave_room(&self, room_id: RoomId, user_id: UserId) -> Result<bool, StoreError>;

    async fn create_message(
        &self,
        room_id: RoomId,
        user_id: UserId,
        content: &str,
    ) -> Result<Message, StoreError>;

    /// 返回消息是否存在并被删除
    async fn delete_message(&self, message_id: MessageId) -> Result<bool, StoreError>;

    /// 按时间正序返回 `before` 之前最新的 `limit` 条消息
    async fn list_messages(
        &self,
        room_id: RoomId,
        before: Option<MessageId>,
        limit: i64,
    ) -> Result<Vec<Message>, StoreError>;
}
