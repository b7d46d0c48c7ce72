//! Chat DTOs - Data Transfer Objects per chat

use crate::entities::Chat;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Minimal chat shape, used as `chat:new` payload and as create response
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatDTO {
    pub id: i32,
    pub name: Option<String>,
}

impl From<Chat> for ChatDTO {
    fn from(value: Chat) -> Self {
        Self {
            id: value.chat_id,
            name: value.name,
        }
    }
}

/// Row of the chat listing read model.
///
/// `last_message` and `last_time` are `None` for chats without messages.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummaryDTO {
    pub id: i32,
    pub name: Option<String>,
    pub last_message: Option<String>,
    pub last_time: Option<i64>,
}

#[derive(Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatDTO {
    #[validate(length(min = 1, max = 255, message = "Chat name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<i32>,
}

#[derive(Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersDTO {
    #[validate(length(min = 1, message = "At least one member is required"))]
    pub member_ids: Vec<i32>,
}

#[derive(Deserialize, Debug, Clone, Validate)]
pub struct RenameChatDTO {
    #[validate(length(min = 1, max = 255, message = "Chat name must be between 1 and 255 characters"))]
    pub name: String,
}
