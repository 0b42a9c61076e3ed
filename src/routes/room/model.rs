use serde::{Deserialize, Serialize};

use crate::store::RoomId;

const ROOM_NAME_MAX: usize = 64;

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateRoomRequest {
    pub name: String,
}

impl CreateRoomRequest {
    /// 返回去掉首尾空白后的房间名
    pub fn validated_name(&self) -> Result<&str, String> {
        let name = self.name.trim();
        let len = name.chars().count();
        if len == 0 || len > ROOM_NAME_MAX {
            return Err(format!("房间名长度必须在1到{}个字符之间", ROOM_NAME_MAX));
        }
        Ok(name)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MembershipResponse {
    pub room_id: RoomId,
    pub joined: bool,
}
