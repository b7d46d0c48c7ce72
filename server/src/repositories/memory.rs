//! MemoryStore - Persistence Gateway in memoria
//!
//! Implementa tutti i trait degli store su tabelle tenute in un unico `RwLock`.
//! Usato quando `DATABASE_URL` non è impostata e nei test.

use super::{ChatStore, CreateUserDTO, MemberStore, MessageStore, UserStore};
use crate::dtos::{ChatSummaryDTO, CreateMessageDTO, MessageDTO};
use crate::entities::user::DEFAULT_ROLE;
use crate::entities::{Chat, ChatMember, Message, User};
use async_trait::async_trait;
use sqlx::Error;
use sqlx::error::{DatabaseError, ErrorKind};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    chats: BTreeMap<i32, Chat>,
    members: BTreeSet<(i32, i32)>,
    // append-only, quindi ordinata per message_id
    messages: Vec<Message>,
    next_user_id: i32,
    next_chat_id: i32,
    next_message_id: i32,
}

impl Tables {
    fn next_id(counter: &mut i32) -> i32 {
        *counter += 1;
        *counter
    }
}

/// Unique key violation, reported like the one raised by MySQL
#[derive(Debug)]
pub struct DuplicateKey(String);

impl DuplicateKey {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for DuplicateKey {}

impl DatabaseError for DuplicateKey {
    fn message(&self) -> &str {
        &self.0
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::UniqueViolation
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every membership row, mostly useful for assertions.
    pub async fn memberships(&self) -> Vec<ChatMember> {
        let tables = self.tables.read().await;
        tables
            .members
            .iter()
            .map(|&(chat_id, user_id)| ChatMember { chat_id, user_id })
            .collect()
    }

    /// Enables or disables an account. Returns `false` for unknown users.
    pub async fn set_enabled(&self, user_id: i32, enabled: bool) -> bool {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user_id) {
            Some(user) => {
                user.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Number of persisted messages across all chats
    pub async fn message_count(&self) -> usize {
        self.tables.read().await.messages.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    #[instrument(skip(self, data), fields(username = %data.username))]
    async fn create(&self, data: &CreateUserDTO) -> Result<User, Error> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == data.username) {
            return Err(Error::Database(Box::new(DuplicateKey::new(format!(
                "Duplicate entry '{}' for key 'users.username'",
                data.username
            )))));
        }
        let user_id = Tables::next_id(&mut tables.next_user_id);
        let user = User {
            user_id,
            username: data.username.clone(),
            name: data.name.clone(),
            password_hash: data.password_hash.clone(),
            enabled: true,
            role: DEFAULT_ROLE.to_string(),
        };
        tables.users.insert(user_id, user.clone());
        debug!(user_id, "User created");
        Ok(user)
    }

    async fn find_by_id(&self, user_id: i32) -> Result<Option<User>, Error> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, Error> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    #[instrument(skip(self, member_ids))]
    async fn create(&self, name: Option<&str>, member_ids: &[i32]) -> Result<Chat, Error> {
        let mut tables = self.tables.write().await;
        let chat_id = Tables::next_id(&mut tables.next_chat_id);
        let chat = Chat {
            chat_id,
            name: name.map(str::to_string),
        };
        tables.chats.insert(chat_id, chat.clone());
        for &user_id in member_ids {
            tables.members.insert((chat_id, user_id));
        }
        debug!(chat_id, "Chat created");
        Ok(chat)
    }

    async fn read(&self, chat_id: i32) -> Result<Option<Chat>, Error> {
        Ok(self.tables.read().await.chats.get(&chat_id).cloned())
    }

    async fn rename(&self, chat_id: i32, name: &str) -> Result<Chat, Error> {
        let mut tables = self.tables.write().await;
        let chat = tables.chats.get_mut(&chat_id).ok_or(Error::RowNotFound)?;
        chat.name = Some(name.to_string());
        Ok(chat.clone())
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<ChatSummaryDTO>, Error> {
        let tables = self.tables.read().await;
        let mut summaries: Vec<ChatSummaryDTO> = tables
            .members
            .iter()
            .filter(|&&(_, uid)| uid == user_id)
            .filter_map(|&(chat_id, _)| tables.chats.get(&chat_id))
            .map(|chat| {
                let last = tables.messages.iter().rev().find(|m| m.chat_id == chat.chat_id);
                ChatSummaryDTO {
                    id: chat.chat_id,
                    name: chat.name.clone(),
                    last_message: last.map(|m| m.content.clone()),
                    last_time: last.map(|m| m.created_at),
                }
            })
            .collect();

        // stesso ordinamento della query MySQL: senza messaggi in fondo
        summaries.sort_by(|a, b| {
            a.last_time
                .is_none()
                .cmp(&b.last_time.is_none())
                .then(b.last_time.cmp(&a.last_time))
                .then(b.id.cmp(&a.id))
        });
        Ok(summaries)
    }
}

#[async_trait]
impl MemberStore for MemoryStore {
    async fn add(&self, chat_id: i32, user_id: i32) -> Result<bool, Error> {
        Ok(self.tables.write().await.members.insert((chat_id, user_id)))
    }

    async fn remove(&self, chat_id: i32, user_id: i32) -> Result<bool, Error> {
        Ok(self.tables.write().await.members.remove(&(chat_id, user_id)))
    }

    async fn is_member(&self, chat_id: i32, user_id: i32) -> Result<bool, Error> {
        Ok(self.tables.read().await.members.contains(&(chat_id, user_id)))
    }

    async fn members_of(&self, chat_id: i32) -> Result<Vec<User>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .range((chat_id, i32::MIN)..=(chat_id, i32::MAX))
            .filter_map(|(_, user_id)| tables.users.get(user_id).cloned())
            .collect())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    #[instrument(skip(self, data), fields(chat_id = data.chat_id, sender_id = data.sender_id))]
    async fn append(&self, data: &CreateMessageDTO) -> Result<Message, Error> {
        let mut tables = self.tables.write().await;
        let message_id = Tables::next_id(&mut tables.next_message_id);
        let message = Message {
            message_id,
            chat_id: data.chat_id,
            sender_id: data.sender_id,
            kind: data.kind,
            content: data.content.clone(),
            image_base64: data.image_base64.clone(),
            created_at: data.created_at,
        };
        tables.messages.push(message.clone());
        debug!(message_id, "Message appended");
        Ok(message)
    }

    async fn history(&self, chat_id: i32) -> Result<Vec<MessageDTO>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .filter_map(|m| {
                let sender = tables.users.get(&m.sender_id)?;
                Some(MessageDTO::from_message(
                    m.clone(),
                    &sender.username,
                    &sender.name,
                ))
            })
            .collect())
    }
}
