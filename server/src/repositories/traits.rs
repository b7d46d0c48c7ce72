//! Storage traits
//!
//! Interfaces of the Persistence Gateway. Every store is object safe so the
//! application state can hold either the MySQL repositories or the in-memory
//! store behind an `Arc<dyn _>`.

use crate::dtos::{ChatSummaryDTO, CreateMessageDTO, MessageDTO};
use crate::entities::{Chat, Message, User};
use async_trait::async_trait;
use sqlx::Error;

/// DTO per creare un nuovo utente (password già hashata)
#[derive(Debug, Clone)]
pub struct CreateUserDTO {
    pub username: String,
    pub password_hash: String,
    pub name: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new enabled user with the default role
    async fn create(&self, data: &CreateUserDTO) -> Result<User, Error>;

    async fn find_by_id(&self, user_id: i32) -> Result<Option<User>, Error>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error>;

    /// All users ordered by id
    async fn list(&self) -> Result<Vec<User>, Error>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Creates a chat and its membership rows in one step.
    ///
    /// `member_ids` must already be deduplicated.
    async fn create(&self, name: Option<&str>, member_ids: &[i32]) -> Result<Chat, Error>;

    async fn read(&self, chat_id: i32) -> Result<Option<Chat>, Error>;

    /// # Returns
    /// * `Err(sqlx::Error::RowNotFound)` - the chat does not exist
    async fn rename(&self, chat_id: i32, name: &str) -> Result<Chat, Error>;

    /// Chats of a user, most recent activity first, chats without messages last
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<ChatSummaryDTO>, Error>;
}

#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Adds a membership row. Returns `false` when the pair already existed.
    async fn add(&self, chat_id: i32, user_id: i32) -> Result<bool, Error>;

    /// Removes a membership row. Returns `false` when there was nothing to remove.
    async fn remove(&self, chat_id: i32, user_id: i32) -> Result<bool, Error>;

    async fn is_member(&self, chat_id: i32, user_id: i32) -> Result<bool, Error>;

    /// Users belonging to the chat ordered by id
    async fn members_of(&self, chat_id: i32) -> Result<Vec<User>, Error>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Appends a message; the returned id is unique and grows with every append
    async fn append(&self, data: &CreateMessageDTO) -> Result<Message, Error>;

    /// Every message of the chat ascending by id, joined with sender display fields
    async fn history(&self, chat_id: i32) -> Result<Vec<MessageDTO>, Error>;
}
