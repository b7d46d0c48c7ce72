//! Chat entity - Entità chat

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Chat {
    pub chat_id: i32,
    // il nome è solo indicativo: una chat senza nome con due membri viene
    // mostrata con il nome dell'altro utente
    pub name: Option<String>,
}
