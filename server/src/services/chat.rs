//! Chat services - Gestione operazioni sulle chat

use crate::core::{AppError, AppState, AuthUser};
use crate::dtos::{ChatDTO, ChatSummaryDTO, CreateChatDTO, MessageDTO, RenameChatDTO};
use axum::{
    Extension,
    extract::{Json, Path, State},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use validator::Validate;

#[derive(Serialize)]
pub struct ChatListDTO {
    pub chats: Vec<ChatSummaryDTO>,
}

#[derive(Serialize)]
pub struct ChatEnvelopeDTO {
    pub chat: ChatDTO,
}

#[derive(Serialize)]
pub struct MessageListDTO {
    pub messages: Vec<MessageDTO>,
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
) -> Result<Json<ChatListDTO>, AppError> {
    let chats = state.members.chats_for(current_user.user_id).await?;
    debug!("User is member of {} chats", chats.len());
    Ok(Json(ChatListDTO { chats }))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>, // ottenuto dall'autenticazione tramite token jwt
    Json(body): Json<CreateChatDTO>,
) -> Result<Json<ChatEnvelopeDTO>, AppError> {
    debug!("Creating new chat");
    // 1. Validare il body (nome opzionale, lista membri)
    // 2. Creare la chat: il creatore è sempre membro
    // 3. Notificare chat:new a tutte le sessioni dei membri, anche se non hanno fatto join

    body.validate()?;

    let (chat, members) = state
        .members
        .create_chat(current_user.user_id, body.name, &body.member_ids)
        .await?;

    state.router.notify_chat_created(&chat, &members);

    info!(chat_id = chat.chat_id, "Chat created");
    Ok(Json(ChatEnvelopeDTO {
        chat: ChatDTO::from(chat),
    }))
}

/// History read model; membership already checked by the middleware
#[instrument(skip(state))]
pub async fn get_chat_messages(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i32>,
) -> Result<Json<MessageListDTO>, AppError> {
    let messages = state.msg.history(chat_id).await?;
    debug!(count = messages.len(), "Messages loaded");
    Ok(Json(MessageListDTO { messages }))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn rename_chat(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i32>,
    Extension(current_user): Extension<AuthUser>,
    Json(body): Json<RenameChatDTO>,
) -> Result<Json<ChatEnvelopeDTO>, AppError> {
    body.validate()?;

    let chat = state
        .members
        .rename(chat_id, current_user.user_id, &body.name)
        .await?;

    Ok(Json(ChatEnvelopeDTO {
        chat: ChatDTO::from(chat),
    }))
}
