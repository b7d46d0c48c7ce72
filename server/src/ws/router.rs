//! Message Router - persiste i messaggi e li distribuisce alle sessioni
//!
//! Per ogni chat l'append sullo store e l'invio alle sessioni avvengono sotto
//! il lock della chat: l'ordine di consegna a un subscriber coincide con
//! l'ordine degli id persistiti.

use crate::core::AppError;
use crate::core::auth::AuthUser;
use crate::dtos::{ChatDTO, CreateMessageDTO, MessageContent, MessageDTO, ServerEvent};
use crate::entities::Chat;
use crate::membership::MembershipAuthority;
use crate::repositories::MessageStore;
use crate::ws::registry::{SessionHandle, SessionRegistry};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, info, instrument};

#[derive(Clone)]
pub struct MessageRouter {
    msg: Arc<dyn MessageStore>,
    members: MembershipAuthority,
    sessions: SessionRegistry,
    /// Last stamped timestamp; stamps never go backwards
    last_stamp: Arc<AtomicI64>,
}

impl MessageRouter {
    pub fn new(
        msg: Arc<dyn MessageStore>,
        members: MembershipAuthority,
        sessions: SessionRegistry,
    ) -> Self {
        Self {
            msg,
            members,
            sessions,
            last_stamp: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Subscribes a session to a chat room after checking membership
    #[instrument(skip(self, session), fields(session_id = session.id(), user_id = session.user_id()))]
    pub async fn join(&self, session: &SessionHandle, chat_id: i32) -> Result<(), AppError> {
        let _chat_lock = self.members.lock_chat(chat_id).await;
        self.members.require_member(chat_id, session.user_id()).await?;

        if !self.sessions.subscribe(session.id(), chat_id) {
            // la sessione si è chiusa mentre si verificava la membership
            debug!("Session gone before join completed");
            return Err(AppError::unauthorized("Session is no longer valid"));
        }
        info!("Session joined chat");
        Ok(())
    }

    /// Persists a message and emits `message:new` to every session subscribed
    /// to the chat.
    ///
    /// The sender must be a member. The message stays persisted even if
    /// no session (including the sender's) is left to receive it.
    #[instrument(skip(self, sender, content), fields(sender_id = sender.user_id, kind = %content.kind()))]
    pub async fn send(
        &self,
        chat_id: i32,
        sender: &AuthUser,
        content: MessageContent,
    ) -> Result<MessageDTO, AppError> {
        let _chat_lock = self.members.lock_chat(chat_id).await;
        self.members.require_member(chat_id, sender.user_id).await?;

        let created_at = self.stamp();
        let kind = content.kind();
        let (text, image_base64) = content.into_columns();

        let message = self
            .msg
            .append(&CreateMessageDTO {
                chat_id,
                sender_id: sender.user_id,
                kind,
                content: text,
                image_base64,
                created_at,
            })
            .await?;

        let dto = MessageDTO::from_message(message, &sender.username, &sender.name);
        let delivered = self
            .sessions
            .broadcast_to_chat(chat_id, Arc::new(ServerEvent::NewMessage(dto.clone())));

        info!(message_id = dto.id, delivered, "Message routed");
        Ok(dto)
    }

    /// Emits `chat:new` to every live session of the given members, whether
    /// or not they are subscribed to the chat room.
    #[instrument(skip(self, chat, member_ids), fields(chat_id = chat.chat_id))]
    pub fn notify_chat_created(&self, chat: &Chat, member_ids: &[i32]) -> usize {
        let event = Arc::new(ServerEvent::NewChat(ChatDTO::from(chat.clone())));
        let delivered: usize = member_ids
            .iter()
            .map(|&user_id| self.sessions.send_to_user(user_id, event.clone()))
            .sum();
        debug!(delivered, "chat:new emitted");
        delivered
    }

    fn stamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self.last_stamp.fetch_max(now, Ordering::SeqCst);
        now.max(previous)
    }
}
