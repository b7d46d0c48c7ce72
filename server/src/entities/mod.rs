//! Entities module - Entità del dominio applicativo
//!
//! Questo modulo contiene tutte le entità che rappresentano i dati persistiti nel database.
//! Ogni entity corrisponde a una tabella nel database.

pub mod chat;
pub mod enums;
pub mod member;
pub mod message;
pub mod user;

// Re-exports per facilitare l'import
pub use chat::Chat;
pub use enums::MessageKind;
pub use member::ChatMember;
pub use message::Message;
pub use user::User;
