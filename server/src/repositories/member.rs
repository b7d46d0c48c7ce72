//! MemberRepository - Repository per la relazione chat/utente

use super::MemberStore;
use crate::entities::User;
use async_trait::async_trait;
use sqlx::{Error, MySqlPool};
use tracing::{debug, instrument};

pub struct MemberRepository {
    connection_pool: MySqlPool,
}

impl MemberRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }
}

#[async_trait]
impl MemberStore for MemberRepository {
    #[instrument(skip(self))]
    async fn add(&self, chat_id: i32, user_id: i32) -> Result<bool, Error> {
        // la primary key (chat_id, user_id) rende l'insert idempotente
        let result = sqlx::query("INSERT IGNORE INTO chat_members (chat_id, user_id) VALUES (?, ?)")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.connection_pool)
            .await?;
        debug!(inserted = result.rows_affected(), "Membership add");
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn remove(&self, chat_id: i32, user_id: i32) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM chat_members WHERE chat_id = ? AND user_id = ?")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.connection_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn is_member(&self, chat_id: i32, user_id: i32) -> Result<bool, Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chat_members WHERE chat_id = ? AND user_id = ?",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(&self.connection_pool)
        .await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn members_of(&self, chat_id: i32) -> Result<Vec<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id AS user_id, u.username, COALESCE(u.name, u.username) AS name,
                   u.password_hash, u.enabled, COALESCE(r.name, 'user') AS role
            FROM chat_members cm
            JOIN users u ON u.id = cm.user_id
            LEFT JOIN roles r ON r.id = u.role_id
            WHERE cm.chat_id = ?
            ORDER BY u.id
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.connection_pool)
        .await
    }
}
