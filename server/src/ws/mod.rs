//! WebSocket Module - Gestione WebSocket per comunicazione real-time
//!
//! Questo modulo gestisce le connessioni WebSocket per la comunicazione in tempo reale
//! tra client e server. Include:
//! - Ammissione della connessione (verifica del token prima dell'upgrade)
//! - Registro delle sessioni e delle stanze sottoscritte
//! - Router dei messaggi (persistenza ordinata + fan-out)
//! - Handler per eventi WebSocket in ingresso

pub mod chat_lock;
pub mod connection;
pub mod event_handlers;
pub mod registry;
pub mod router;

// Re-exports pubblici
pub use connection::handle_socket;
pub use registry::{InternalSignal, SessionHandle, SessionId, SessionRegistry};
pub use router::MessageRouter;

use crate::core::{AppError, AppState, AuthUser, auth::bearer_token, authenticate_token};
use axum::{
    extract::{Query, State, ws::WebSocketUpgrade},
    http::{HeaderMap, header},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Deserialize, Debug, Default)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

/// Verifies the credential token presented at connection time.
///
/// Any failure is final: the caller must not upgrade the connection.
#[instrument(skip(state, token))]
pub async fn admit(state: &AppState, token: Option<&str>) -> Result<AuthUser, AppError> {
    let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
        warn!("Connection without credential token rejected");
        return Err(AppError::unauthorized("Missing credential token"));
    };

    let user = authenticate_token(state, token.trim()).await?;
    info!(user_id = user.user_id, "Connection admitted");
    Ok(AuthUser::from(&user))
}

/// Entry point per gestire richieste di upgrade WebSocket
/// Operazioni:
/// 1. Estrarre il token dalla query string (`?token=`) o dall'header Authorization
/// 2. Ammettere la connessione, altrimenti 401 senza upgrade
/// 3. Eseguire upgrade HTTP -> WebSocket e passare la connessione ad handle_socket
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsAuthQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let token = query.token.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_string)
    });

    let user = admit(&state, token.as_deref()).await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}
