//! Services module - Coordinatore per tutti i service handler HTTP
//!
//! Handler sottili sopra la Membership Authority e il Message Router:
//! login/registrazione, elenco utenti, read model delle chat e gestione membri.

pub mod auth;
pub mod chat;
pub mod membership;
pub mod user;

// Re-exports per facilitare l'import
pub use auth::{login_user, register_user};
pub use chat::{create_chat, get_chat_messages, list_chats, rename_chat};
pub use membership::{add_members, list_chat_members, remove_member};
pub use user::list_users;

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Root endpoint - health check
pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, "Server is running!")
}
