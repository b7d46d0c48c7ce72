//! ChatRepository - Repository per la gestione delle chat

use super::ChatStore;
use crate::dtos::ChatSummaryDTO;
use crate::entities::Chat;
use async_trait::async_trait;
use sqlx::{Error, MySqlPool};
use tracing::{debug, info, instrument};

// CHAT REPOSITORY
pub struct ChatRepository {
    connection_pool: MySqlPool,
}

impl ChatRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }
}

#[async_trait]
impl ChatStore for ChatRepository {
    #[instrument(skip(self, member_ids), fields(members = member_ids.len()))]
    async fn create(&self, name: Option<&str>, member_ids: &[i32]) -> Result<Chat, Error> {
        debug!("Creating new chat");
        // chat e membri nella stessa transazione
        let mut tx = self.connection_pool.begin().await?;

        let result = sqlx::query("INSERT INTO chats (name) VALUES (?)")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        let chat_id = result.last_insert_id() as i32;

        for user_id in member_ids {
            sqlx::query("INSERT IGNORE INTO chat_members (chat_id, user_id) VALUES (?, ?)")
                .bind(chat_id)
                .bind(*user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!("Chat created with id {}", chat_id);

        Ok(Chat {
            chat_id,
            name: name.map(str::to_string),
        })
    }

    #[instrument(skip(self))]
    async fn read(&self, chat_id: i32) -> Result<Option<Chat>, Error> {
        sqlx::query_as::<_, Chat>("SELECT id AS chat_id, name FROM chats WHERE id = ?")
            .bind(chat_id)
            .fetch_optional(&self.connection_pool)
            .await
    }

    #[instrument(skip(self, name))]
    async fn rename(&self, chat_id: i32, name: &str) -> Result<Chat, Error> {
        debug!("Renaming chat");
        // rows_affected è 0 anche se il nome non cambia, quindi si rilegge la riga
        sqlx::query("UPDATE chats SET name = ? WHERE id = ?")
            .bind(name)
            .bind(chat_id)
            .execute(&self.connection_pool)
            .await?;

        self.read(chat_id).await?.ok_or(Error::RowNotFound)
    }

    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<ChatSummaryDTO>, Error> {
        sqlx::query_as::<_, ChatSummaryDTO>(
            r#"
            SELECT c.id, c.name,
              (SELECT m.content FROM messages m WHERE m.chat_id = c.id ORDER BY m.id DESC LIMIT 1) AS last_message,
              (SELECT m.created_at FROM messages m WHERE m.chat_id = c.id ORDER BY m.id DESC LIMIT 1) AS last_time
            FROM chats c
            JOIN chat_members cm ON cm.chat_id = c.id
            WHERE cm.user_id = ?
            ORDER BY (last_time IS NULL), last_time DESC, c.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.connection_pool)
        .await
    }
}
