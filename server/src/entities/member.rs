//! ChatMember entity - relazione (chat, utente), unica per coppia

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, sqlx::FromRow)]
pub struct ChatMember {
    pub chat_id: i32,
    pub user_id: i32,
}
