//! DTOs module - Data Transfer Objects
//!
//! Questo modulo contiene tutti i DTOs usati per la comunicazione client-server.
//! I DTOs separano la rappresentazione esterna (API e WebSocket) dalla rappresentazione interna (entities).

pub mod chat;
pub mod message;
pub mod user;
pub mod ws_event;

// Re-exports per facilitare l'import
pub use chat::{AddMembersDTO, ChatDTO, ChatSummaryDTO, CreateChatDTO, RenameChatDTO};
pub use message::{CreateMessageDTO, MessageContent, MessageDTO};
pub use user::{AuthResponseDTO, LoginDTO, RegisterDTO, UserDTO};
pub use ws_event::{ClientEvent, ContentDTO, JoinChatDTO, SendMessageDTO, ServerEvent};
