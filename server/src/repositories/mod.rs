//! Repositories module - Persistence Gateway
//!
//! Questo modulo organizza i repository in sotto-moduli separati per una migliore manutenibilità.
//! Ogni repository MySQL gestisce le operazioni di database per una specifica entità,
//! `MemoryStore` implementa gli stessi trait in memoria.

// Le query usano le funzioni runtime di sqlx (`query_as::<_, T>`) e non le macro
// `query!`/`query_as!`.

pub mod chat;
pub mod member;
pub mod memory;
pub mod message;
pub mod traits;
pub mod user;

// Re-esportazione dei trait per facilitare l'import
pub use traits::{ChatStore, CreateUserDTO, MemberStore, MessageStore, UserStore};

// Re-esportazione delle struct dei repository per facilitare l'import
pub use chat::ChatRepository;
pub use member::MemberRepository;
pub use memory::MemoryStore;
pub use message::MessageRepository;
pub use user::UserRepository;
