use async_trait::async_trait;
use sqlx::PgPool;

use super::{ChatStore, Message, MessageId, Room, RoomId, StoreError, User, UserId};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 执行 migrations/ 下的建表脚本
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[async_trait]
impl ChatStore for PgStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, created_at)
            VALUES ($1, $2, NOW())
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => {
                tracing::info!(user_id = user.id, "Created user");
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::UsernameTaken),
            Err(e) => {
                tracing::error!("Failed to create user: {:?}", e);
                Err(e.into())
            }
        }
    }

    async fn find_room_membership(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM room_members
                WHERE room_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn find_room(&self, room_id: RoomId) -> Result<Option<Room>, StoreError> {
        let room = sqlx::query_as::<_, Room>(
            r#"
            SELECT id, name, owner_id, created_at
            FROM rooms
            WHERE id = $1
            "#,
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(room)
    }

    async fn find_message(&self, message_id: MessageId) -> Result<Option<Message>, StoreError> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, room_id, user_id, content, created_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    async fn create_room(&self, name: &str, owner_id: UserId) -> Result<Room, StoreError> {
        let mut tx = self.pool.begin().await?;

        let room = sqlx::query_as::<_, Room>(
            r#"
            INSERT INTO rooms (name, owner_id, created_at)
            VALUES ($1, $2, NOW())
            RETURNING id, name, owner_id, created_at
            "#,
        )
        .bind(name)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::RoomNameTaken
            } else {
                StoreError::Database(e)
            }
        })?;

        // 创建房间的同时把创建者加入房间
        sqlx::query(
            r#"
            INSERT INTO room_members (room_id, user_id, joined_at)
            VALUES ($1, $2, NOW())
            "#,
        )
        .bind(room.id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(room)
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let rooms = sqlx::query_as::<_, Room>(
            r#"
            SELECT id, name, owner_id, created_at
            FROM rooms
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rooms)
    }

    async fn join_room(&self, room_id: RoomId, user_id: UserId) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO room_members (room_id, user_id, joined_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (room_id, user_id) DO NOTHING
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn leave_room(&self, room_id: RoomId, user_id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM room_members
            WHERE room_id = $1 AND user_id = $2
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_message(
        &self,
        room_id: RoomId,
        user_id: UserId,
        content: &str,
    ) -> Result<Message, StoreError> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (room_id, user_id, content, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, room_id, user_id, content, created_at
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    async fn delete_message(&self, message_id: MessageId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_messages(
        &self,
        room_id: RoomId,
        before: Option<MessageId>,
        limit: i64,
    ) -> Result<Vec<Message>, StoreError> {
        let mut messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, room_id, user_id, content, created_at
            FROM messages
            WHERE room_id = $1
                AND ($2::BIGINT IS NULL OR id < $2)
            ORDER BY id DESC
            LIMIT $3
            "#,
        )
        .bind(room_id)
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        messages.reverse();
        Ok(messages)
    }
}
