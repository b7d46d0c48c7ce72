//! Message DTOs - Data Transfer Objects per messaggi

use crate::core::AppError;
use crate::entities::{Message, MessageKind};
use data_encoding::BASE64;
use serde::{Deserialize, Serialize};

/// Full message record, sent as `message:new` and returned by the history read model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MessageDTO {
    pub id: i32,
    pub chat_id: i32,
    pub user_id: i32,
    pub username: String,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub kind: MessageKind,
    pub content: String,
    pub image_base64: Option<String>,
    pub created_at: i64,
}

impl MessageDTO {
    /// Joins a persisted message with the display fields of its sender.
    pub fn from_message(message: Message, username: &str, name: &str) -> Self {
        Self {
            id: message.message_id,
            chat_id: message.chat_id,
            user_id: message.sender_id,
            username: username.to_string(),
            name: name.to_string(),
            kind: message.kind,
            content: message.content,
            image_base64: message.image_base64,
            created_at: message.created_at,
        }
    }
}

/// DTO per creare un nuovo messaggio (senza message_id, assegnato dallo store)
#[derive(Debug, Clone)]
pub struct CreateMessageDTO {
    pub chat_id: i32,
    pub sender_id: i32,
    pub kind: MessageKind,
    pub content: String,
    pub image_base64: Option<String>,
    pub created_at: i64,
}

/// Validated message content.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text(String),
    Image { payload: String, caption: String },
}

impl MessageContent {
    /// Builds a text content, `None` when nothing but whitespace is left.
    pub fn text(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            None
        } else {
            Some(MessageContent::Text(text))
        }
    }

    /// Builds an image content after checking the payload decodes as base64.
    ///
    /// Both raw base64 and `data:<mime>;base64,<data>` URLs are accepted; the
    /// payload is kept exactly as given. An empty payload falls back to the
    /// caption as plain text.
    pub fn image(payload: String, caption: Option<String>) -> Result<Option<Self>, AppError> {
        let caption = caption.unwrap_or_default();
        if payload.trim().is_empty() {
            return Ok(Self::text(caption));
        }

        let encoded = match payload.strip_prefix("data:") {
            Some(rest) => rest
                .split_once(";base64,")
                .map(|(_, data)| data)
                .ok_or_else(|| AppError::bad_request("Image data URL must be base64 encoded"))?,
            None => payload.as_str(),
        };
        BASE64
            .decode(encoded.trim().as_bytes())
            .map_err(|e| AppError::bad_request("Invalid image payload").with_details(e.to_string()))?;

        Ok(Some(MessageContent::Image { payload, caption }))
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            MessageContent::Text(_) => MessageKind::Text,
            MessageContent::Image { .. } => MessageKind::Image,
        }
    }

    /// Splits into the `(content, image_base64)` columns.
    pub fn into_columns(self) -> (String, Option<String>) {
        match self {
            MessageContent::Text(text) => (text, None),
            MessageContent::Image { payload, caption } => (caption, Some(payload)),
        }
    }
}
