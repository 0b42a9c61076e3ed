use serde::{Deserialize, Serialize};

use crate::store::MessageId;

const CONTENT_MAX: usize = 2000;
const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize, Serialize)]
pub struct PostMessageRequest {
    pub content: String,
}

impl PostMessageRequest {
    pub fn validate(&self) -> Result<(), String> {
        let len = self.content.chars().count();
        if self.content.trim().is_empty() || len > CONTENT_MAX {
            return Err(format!("消息长度必须在1到{}个字符之间", CONTENT_MAX));
        }
        Ok(())
    }
}

/// 分页参数：`before` 为消息ID，向更早的消息翻页
#[derive(Debug, Default, Deserialize)]
pub struct ListMessagesQuery {
    pub before: Option<MessageId>,
    pub limit: Option<i64>,
}

impl ListMessagesQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}
