//! MessageRepository - Repository per la gestione dei messaggi

use super::MessageStore;
use crate::dtos::{CreateMessageDTO, MessageDTO};
use crate::entities::Message;
use async_trait::async_trait;
use sqlx::{Error, MySqlPool};
use tracing::{debug, instrument};

// MESSAGE REPO
pub struct MessageRepository {
    connection_pool: MySqlPool,
}

impl MessageRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    #[instrument(skip(self, data), fields(chat_id = data.chat_id, sender_id = data.sender_id))]
    async fn append(&self, data: &CreateMessageDTO) -> Result<Message, Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages (chat_id, user_id, type, content, image_base64, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(data.chat_id)
        .bind(data.sender_id)
        .bind(data.kind.as_str())
        .bind(&data.content)
        .bind(&data.image_base64)
        .bind(data.created_at)
        .execute(&self.connection_pool)
        .await?;

        // AUTO_INCREMENT globale: crescente anche all'interno della singola chat
        let message_id = result.last_insert_id() as i32;
        debug!(message_id, "Message appended");

        Ok(Message {
            message_id,
            chat_id: data.chat_id,
            sender_id: data.sender_id,
            kind: data.kind,
            content: data.content.clone(),
            image_base64: data.image_base64.clone(),
            created_at: data.created_at,
        })
    }

    #[instrument(skip(self))]
    async fn history(&self, chat_id: i32) -> Result<Vec<MessageDTO>, Error> {
        sqlx::query_as::<_, MessageDTO>(
            r#"
            SELECT m.id, m.chat_id, m.user_id, u.username, COALESCE(u.name, u.username) AS name,
                   m.type AS kind, m.content, m.image_base64, m.created_at
            FROM messages m
            JOIN users u ON u.id = m.user_id
            WHERE m.chat_id = ?
            ORDER BY m.id ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.connection_pool)
        .await
    }
}
