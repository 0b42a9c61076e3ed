use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{ChatStore, Message, MessageId, Room, RoomId, StoreError, User, UserId};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    usernames: HashMap<String, UserId>,
    rooms: BTreeMap<RoomId, Room>,
    members: HashSet<(RoomId, UserId)>,
    messages: BTreeMap<MessageId, Message>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// 内存实现，用于测试和无数据库的本地运行
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .usernames
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.usernames.contains_key(username) {
            return Err(StoreError::UsernameTaken);
        }

        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.usernames.insert(user.username.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_room_membership(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .members
            .contains(&(room_id, user_id)))
    }

    async fn find_room(&self, room_id: RoomId) -> Result<Option<Room>, StoreError> {
        Ok(self.tables.read().await.rooms.get(&room_id).cloned())
    }

    async fn find_message(&self, message_id: MessageId) -> Result<Option<Message>, StoreError> {
        Ok(self.tables.read().await.messages.get(&message_id).cloned())
    }

    async fn create_room(&self, name: &str, owner_id: UserId) -> Result<Room, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.rooms.values().any(|room| room.name == name) {
            return Err(StoreError::RoomNameTaken);
        }

        let room = Room {
            id: tables.next_id(),
            name: name.to_string(),
            owner_id,
            created_at: Utc::now(),
        };
        tables.members.insert((room.id, owner_id));
        tables.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        Ok(self.tables.read().await.rooms.values().cloned().collect())
    }

    async fn join_room(&self, room_id: RoomId, user_id: UserId) -> Result<(), StoreError> {
        self.tables.write().await.members.insert((room_id, user_id));
        Ok(())
    }

    async fn leave_room(&self, room_id: RoomId, user_id: UserId) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .write()
            .await
            .members
            .remove(&(room_id, user_id)))
    }

    async fn create_message(
        &self,
        room_id: RoomId,
        user_id: UserId,
        content: &str,
    ) -> Result<Message, StoreError> {
        let mut tables = self.tables.write().await;
        let message = Message {
            id: tables.next_id(),
            room_id,
            user_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        tables.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn delete_message(&self, message_id: MessageId) -> Result<bool, StoreError> {
        Ok(self
            .tables
            .write()
            .await
            .messages
            .remove(&message_id)
            .is_some())
    }

    async fn list_messages(
        &self,
        room_id: RoomId,
        before: Option<MessageId>,
        limit: i64,
    ) -> Result<Vec<Message>, StoreError> {
        let tables = self.tables.read().await;
        let mut messages: Vec<Message> = tables
            .messages
            .values()
            .rev()
            .filter(|m| m.room_id == room_id && before.is_none_or(|id| m.id < id))
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        messages.reverse();
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = MemoryStore::new();
        store.create_user("alice", "hash").await.unwrap();
        let err = store.create_user("alice", "other").await.unwrap_err();
        assert!(matches!(err, StoreError::UsernameTaken));
    }

    #[tokio::test]
    async fn owner_is_member_of_new_room() {
        let store = MemoryStore::new();
        let alice = store.create_user("alice", "hash").await.unwrap();
        let room = store.create_room("general", alice.id).await.unwrap();
        assert!(store.find_room_membership(alice.id, room.id).await.unwrap());
        assert!(store.leave_room(room.id, alice.id).await.unwrap());
        assert!(!store.leave_room(room.id, alice.id).await.unwrap());
    }

    #[tokio::test]
    async fn list_messages_pages_backwards() {
        let store = MemoryStore::new();
        let alice = store.create_user("alice", "hash").await.unwrap();
        let room = store.create_room("general", alice.id).await.unwrap();
        let mut ids = Vec::new();
        for i in 0..5 {
            let m = store
                .create_message(room.id, alice.id, &format!("m{i}"))
                .await
                .unwrap();
            ids.push(m.id);
        }

        let latest = store.list_messages(room.id, None, 2).await.unwrap();
        assert_eq!(
            latest.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
            ["m3", "m4"]
        );

        let older = store.list_messages(room.id, Some(ids[3]), 10).await.unwrap();
        assert_eq!(older.len(), 3);
        assert_eq!(older[0].content, "m0");
    }
}
