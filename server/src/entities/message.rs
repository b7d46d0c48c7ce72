//! Message entity - Entità messaggio

use super::enums::MessageKind;
use serde::{Deserialize, Serialize};

/// A persisted message. Immutable once written.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Message {
    pub message_id: i32,
    pub chat_id: i32,
    pub sender_id: i32,
    #[sqlx(try_from = "String")]
    pub kind: MessageKind,
    /// Text body; for images this is the (possibly empty) caption.
    pub content: String,
    /// Image payload exactly as the client sent it (base64 or data URL).
    pub image_base64: Option<String>,
    /// Wall-clock milliseconds, never decreasing within a chat.
    pub created_at: i64,
}
