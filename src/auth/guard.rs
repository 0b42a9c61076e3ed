use std::sync::Arc;

use crate::store::{ChatStore, MessageId, RoomId, StoreError, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Room(RoomId),
    Message(MessageId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

/// 拒绝时不区分资源不存在与无权限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permitted,
    Denied,
}

/// 每次请求都重新查询成员关系，不缓存授权结果
#[derive(Clone)]
pub struct AccessGuard {
    store: Arc<dyn ChatStore>,
}

impl AccessGuard {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    pub async fn authorize(
        &self,
        user_id: UserId,
        resource: Resource,
        action: Action,
    ) -> Result<Decision, StoreError> {
        let (permitted, reason) = match resource {
            Resource::Room(room_id) => self.check_room(user_id, room_id, action).await?,
            Resource::Message(message_id) => {
                self.check_message(user_id, message_id, action).await?
            }
        };

        if permitted {
            Ok(Decision::Permitted)
        } else {
            tracing::debug!(user_id, ?resource, ?action, reason, "Access denied");
            Ok(Decision::Denied)
        }
    }

    async fn check_room(
        &self,
        user_id: UserId,
        room_id: RoomId,
        action: Action,
    ) -> Result<(bool, &'static str), StoreError> {
        if self.store.find_room_membership(user_id, room_id).await? {
            return Ok((true, ""));
        }

        match action {
            Action::Read => Ok((false, "not_a_member")),
            // 房主即使退出房间也能发言
            Action::Write => match self.store.find_room(room_id).await? {
                Some(room) if room.owner_id == user_id => Ok((true, "")),
                Some(_) => Ok((false, "not_a_member")),
                None => Ok((false, "room_not_found")),
            },
        }
    }

    async fn check_message(
        &self,
        user_id: UserId,
        message_id: MessageId,
        action: Action,
    ) -> Result<(bool, &'static str), StoreError> {
        let Some(message) = self.store.find_message(message_id).await? else {
            return Ok((false, "message_not_found"));
        };

        match action {
            Action::Read => self.check_room(user_id, message.room_id, Action::Read).await,
            // 作者退出房间后失去对自己消息的写权限，只有房主不受成员关系限制
            Action::Write => {
                let is_member = self
                    .store
                    .find_room_membership(user_id, message.room_id)
                    .await?;
                if message.user_id == user_id && is_member {
                    return Ok((true, ""));
                }
                let is_room_owner = self
                    .store
                    .find_room(message.room_id)
                    .await?
                    .is_some_and(|room| room.owner_id == user_id);
                if is_room_owner {
                    Ok((true, ""))
                } else {
                    Ok((false, "not_author_or_owner"))
                }
            }
        }
    }
}
