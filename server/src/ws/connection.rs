//! WebSocket Connection Management - ciclo di vita di una connessione ammessa

use crate::core::{AppState, AuthUser};
use crate::ws::event_handlers::process_frame;
use crate::ws::registry::{InternalSignal, SessionHandle, SessionId};
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// Runs one connection until it closes.
///
/// The session is registered before any frame is read and unregistered
/// exactly once when the read loop ends, whatever the cause.
#[instrument(skip(ws, state, user), fields(user_id = user.user_id))]
pub async fn handle_socket(ws: WebSocket, state: Arc<AppState>, user: AuthUser) {
    info!("WebSocket connection established");

    // Dividiamo il WebSocket in due metà: sender e receiver
    let (ws_tx, ws_rx) = ws.split();

    // Canale interno verso il task di scrittura
    let (int_tx, int_rx) = unbounded_channel::<InternalSignal>();
    let session = state.sessions.register(user, int_tx);

    let writer = tokio::spawn(write_ws(session.id(), ws_tx, int_rx));

    listen_ws(&session, ws_rx, &state).await;

    // Cleanup
    info!("Cleaning up connection");
    session.send(InternalSignal::Shutdown);
    state.sessions.unregister(session.id());
    if let Err(e) = writer.await {
        error!("Write task panicked: {:?}", e);
    }
    info!("Connection closed");
}

#[instrument(skip(websocket_tx, internal_rx))]
pub async fn write_ws(
    session_id: SessionId,
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut internal_rx: UnboundedReceiver<InternalSignal>,
) {
    debug!("Write task started");

    while let Some(signal) = internal_rx.recv().await {
        match signal {
            InternalSignal::Event(event) => {
                let json = match serde_json::to_string(event.as_ref()) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize event: {:?}", e);
                        continue;
                    }
                };
                if let Err(e) = websocket_tx.send(Message::Text(Utf8Bytes::from(json))).await {
                    warn!("Failed to send event, closing writer: {:?}", e);
                    break;
                }
            }
            InternalSignal::Shutdown => {
                debug!("Shutdown signal received");
                break;
            }
        }
    }

    // chiude il canale: il listener vede la chiusura e termina
    internal_rx.close();
    let _ = websocket_tx.close().await;
    debug!("Write task terminated");
}

#[instrument(skip(session, websocket_rx, state), fields(session_id = session.id()))]
pub async fn listen_ws(
    session: &SessionHandle,
    mut websocket_rx: SplitStream<WebSocket>,
    state: &AppState,
) {
    debug!("Listen task started");
    let idle_timeout = state.ws_idle_timeout;

    loop {
        // il frame viene elaborato nel ramo del select: un invio già iniziato
        // arriva sempre in fondo anche se il writer nel frattempo si chiude
        let frame = tokio::select! {
            frame = timeout(idle_timeout, websocket_rx.next()) => frame,
            _ = session.closed() => {
                info!("Writer gone, stopping listener");
                break;
            }
        };

        match frame {
            Ok(Some(Ok(msg))) => match msg {
                Message::Text(text) => process_frame(state, session, text.as_str()).await,
                Message::Binary(_) => warn!("Binary frame ignored"),
                Message::Close(_) => {
                    info!("Close message received");
                    break;
                }
                _ => {}
            },
            Ok(Some(Err(e))) => {
                warn!("WebSocket error: {:?}", e);
                break;
            }
            Ok(None) => {
                info!("WebSocket stream ended");
                break;
            }
            Err(_) => {
                warn!(timeout_secs = idle_timeout.as_secs(), "Connection timeout");
                break;
            }
        }
    }

    debug!("Listen task terminated");
}
