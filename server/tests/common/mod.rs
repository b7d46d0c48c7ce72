#![allow(dead_code)]

use axum_test::TestServer;
use chat_relay::auth::encode_jwt;
use chat_relay::core::AppState;
use chat_relay::dtos::ServerEvent;
use chat_relay::entities::User;
use chat_relay::repositories::{CreateUserDTO, MemoryStore, UserStore};
use futures_util::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message as WsMessage};

pub const TEST_JWT_SECRET: &str = "ilmiobellissimosegretochevaassolutamentecambiato";

pub type TestSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Crea un AppState per i test, su store in memoria
///
/// # Returns
/// Arc<AppState> configurato con il JWT secret di test
pub fn create_test_state() -> Arc<AppState> {
    Arc::new(AppState::in_memory(
        Arc::new(MemoryStore::new()),
        TEST_JWT_SECRET.to_string(),
    ))
}

/// Come `create_test_state`, restituendo anche lo store per manipolarlo nei test
pub fn create_test_state_with_store() -> (Arc<AppState>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::in_memory(store.clone(), TEST_JWT_SECRET.to_string()));
    (state, store)
}

/// Crea un TestServer per i test
///
/// # Arguments
/// * `state` - AppState da utilizzare per il server
///
/// # Returns
/// TestServer configurato e pronto per eseguire richieste
pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = chat_relay::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Inserisce un utente direttamente nello store (senza bcrypt)
pub async fn seed_user(state: &AppState, username: &str, name: &str) -> User {
    state
        .user
        .create(&CreateUserDTO {
            username: username.to_string(),
            password_hash: String::new(),
            name: name.to_string(),
        })
        .await
        .expect("Failed to seed user")
}

/// Genera un JWT token valido per l'utente
pub fn create_test_jwt(user: &User) -> String {
    encode_jwt(user, TEST_JWT_SECRET, 24).expect("Failed to create JWT token")
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Avvia il router su una porta effimera, per i test con socket reali
pub async fn spawn_server(state: Arc<AppState>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = chat_relay::create_router(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    addr
}

pub async fn connect_ws(addr: SocketAddr, token: &str) -> TestSocket {
    let url = format!("ws://{}/ws?token={}", addr, token);
    let (socket, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("WebSocket connection failed");
    socket
}

/// Legge il prossimo evento dal server, ignorando i frame non testuali
pub async fn next_event(socket: &mut TestSocket) -> ServerEvent {
    let read = async {
        while let Some(frame) = socket.next().await {
            if let WsMessage::Text(text) = frame.expect("WebSocket read failed") {
                return serde_json::from_str::<ServerEvent>(&text).expect("Invalid server event");
            }
        }
        panic!("WebSocket closed before an event arrived");
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("Timed out waiting for a server event")
}

/// Verifica che nessun evento arrivi entro una breve finestra
pub async fn assert_no_event(socket: &mut TestSocket) {
    let outcome = tokio::time::timeout(Duration::from_millis(200), socket.next()).await;
    if let Ok(Some(Ok(WsMessage::Text(text)))) = outcome {
        panic!("Unexpected event: {}", text);
    }
}

/// Attende che una condizione sullo stato diventi vera
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Condition not met in time");
}
