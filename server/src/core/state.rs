//! Application State - Stato globale dell'applicazione
//!
//! Contiene gli store, la configurazione necessaria a runtime e i componenti
//! real-time condivisi (registro sessioni, membership, router dei messaggi).

use crate::core::Config;
use crate::membership::MembershipAuthority;
use crate::repositories::{
    ChatRepository, ChatStore, MemberRepository, MemberStore, MemoryStore, MessageRepository,
    MessageStore, UserRepository, UserStore,
};
use crate::ws::registry::SessionRegistry;
use crate::ws::router::MessageRouter;
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Duration;

/// Stato globale dell'applicazione condiviso tra tutte le route e middleware
pub struct AppState {
    /// Store degli utenti
    pub user: Arc<dyn UserStore>,

    /// Store delle chat
    pub chat: Arc<dyn ChatStore>,

    /// Store della relazione chat/utente
    pub member: Arc<dyn MemberStore>,

    /// Store dei messaggi
    pub msg: Arc<dyn MessageStore>,

    /// Secret key per JWT token
    pub jwt_secret: String,

    /// Durata dei token emessi, in ore
    pub token_ttl_hours: i64,

    /// Una connessione WebSocket silenziosa per questo tempo viene chiusa
    pub ws_idle_timeout: Duration,

    /// Sessioni WebSocket attive e stanze sottoscritte
    pub sessions: SessionRegistry,

    /// Unica fonte di verità su chi appartiene a quale chat
    pub members: MembershipAuthority,

    /// Persistenza ordinata e fan-out dei messaggi
    pub router: MessageRouter,
}

impl AppState {
    /// Crea una nuova istanza di AppState sui repository MySQL
    ///
    /// # Arguments
    /// * `pool` - Pool di connessioni MySQL condiviso (dimensione fissa)
    /// * `jwt_secret` - Chiave segreta per la firma dei token JWT
    pub fn new(pool: MySqlPool, jwt_secret: String) -> Self {
        Self::from_stores(
            Arc::new(UserRepository::new(pool.clone())),
            Arc::new(ChatRepository::new(pool.clone())),
            Arc::new(MemberRepository::new(pool.clone())),
            Arc::new(MessageRepository::new(pool)),
            jwt_secret,
        )
    }

    /// Crea un AppState su uno store in memoria
    pub fn in_memory(store: Arc<MemoryStore>, jwt_secret: String) -> Self {
        Self::from_stores(store.clone(), store.clone(), store.clone(), store, jwt_secret)
    }

    pub fn from_stores(
        user: Arc<dyn UserStore>,
        chat: Arc<dyn ChatStore>,
        member: Arc<dyn MemberStore>,
        msg: Arc<dyn MessageStore>,
        jwt_secret: String,
    ) -> Self {
        let defaults = Config::default();
        let sessions = SessionRegistry::new();
        let members =
            MembershipAuthority::new(user.clone(), chat.clone(), member.clone(), sessions.clone());
        let router = MessageRouter::new(msg.clone(), members.clone(), sessions.clone());

        Self {
            user,
            chat,
            member,
            msg,
            jwt_secret,
            token_ttl_hours: defaults.token_ttl_hours,
            ws_idle_timeout: Duration::from_secs(defaults.ws_idle_timeout_secs),
            sessions,
            members,
            router,
        }
    }

    /// Applies the runtime knobs of the configuration
    pub fn with_config(mut self, config: &Config) -> Self {
        self.token_ttl_hours = config.token_ttl_hours;
        self.ws_idle_timeout = Duration::from_secs(config.ws_idle_timeout_secs);
        self
    }
}
