//! WebSocket Event Handlers - Handler per eventi WebSocket in ingresso

use crate::core::{AppError, AppState};
use crate::dtos::{ClientEvent, SendMessageDTO, ServerEvent};
use crate::ws::registry::{InternalSignal, SessionHandle};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Handles one text frame from a client.
///
/// Malformed frames are ignored. A failed operation is reported to this
/// session only as an `error` event and never closes the connection.
#[instrument(skip(state, session, text), fields(session_id = session.id(), user_id = session.user_id()))]
pub async fn process_frame(state: &AppState, session: &SessionHandle, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            warn!("Failed to deserialize client event: {}", e);
            return;
        }
    };

    let result = match event {
        ClientEvent::JoinChat(join) => state.router.join(session, join.chat_id).await,
        ClientEvent::SendMessage(send) => process_send(state, session, send).await,
    };

    if let Err(err) = result {
        warn!(status = %err.status(), "Client operation failed: {}", err);
        send_error(session, &err);
    }
}

/// Handler per messaggi di chat
/// Operazioni:
/// 1. Validare il contenuto (testo vuoto senza immagine => scartato in silenzio)
/// 2. Delegare al router: membership, persistenza, fan-out
async fn process_send(
    state: &AppState,
    session: &SessionHandle,
    send: SendMessageDTO,
) -> Result<(), AppError> {
    match send.content.into_content()? {
        Some(content) => {
            state.router.send(send.chat_id, session.user(), content).await?;
            Ok(())
        }
        None => {
            debug!(chat_id = send.chat_id, "Empty message dropped");
            Ok(())
        }
    }
}

/// Invia un evento di errore alla sola sessione che ha fatto la richiesta
pub fn send_error(session: &SessionHandle, err: &AppError) {
    let event = ServerEvent::Error {
        code: err.status().as_u16(),
        message: err.message().to_string(),
    };
    if !session.send(InternalSignal::Event(Arc::new(event))) {
        debug!("Client disconnected, error not delivered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AuthUser;
    use crate::repositories::{CreateUserDTO, MemoryStore, MessageStore, UserStore};
    use serde_json::json;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    async fn state_with_chat() -> (AppState, Arc<MemoryStore>, AuthUser, AuthUser, i32) {
        let store = Arc::new(MemoryStore::new());
        let mut users = Vec::new();
        for name in ["alice", "bob"] {
            let user = UserStore::create(
                store.as_ref(),
                &CreateUserDTO {
                    username: name.to_string(),
                    password_hash: String::new(),
                    name: name.to_string(),
                },
            )
            .await
            .unwrap();
            users.push(AuthUser::from(&user));
        }
        let state = AppState::in_memory(store.clone(), "secret".to_string());
        let (chat, _) = state
            .members
            .create_chat(users[0].user_id, None, &[])
            .await
            .unwrap();
        let bob = users.pop().unwrap();
        let alice = users.pop().unwrap();
        (state, store, alice, bob, chat.chat_id)
    }

    fn connect(state: &AppState, user: &AuthUser) -> (SessionHandle, UnboundedReceiver<InternalSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (state.sessions.register(user.clone(), tx), rx)
    }

    fn next_event(rx: &mut UnboundedReceiver<InternalSignal>) -> Option<ServerEvent> {
        match rx.try_recv() {
            Ok(InternalSignal::Event(event)) => Some(event.as_ref().clone()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_join_then_send_delivers_to_sender() {
        let (state, _, alice, _, chat_id) = state_with_chat().await;
        let (session, mut rx) = connect(&state, &alice);

        let join = json!({"event": "chat:join", "data": {"chatId": chat_id}}).to_string();
        process_frame(&state, &session, &join).await;
        let send = json!({"event": "message:send", "data": {"chatId": chat_id, "content": "hi"}})
            .to_string();
        process_frame(&state, &session, &send).await;

        match next_event(&mut rx) {
            Some(ServerEvent::NewMessage(msg)) => {
                assert_eq!(msg.content, "hi");
                assert_eq!(msg.user_id, alice.user_id);
            }
            other => panic!("expected message:new, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_send_is_silent_noop() {
        let (state, store, alice, _, chat_id) = state_with_chat().await;
        let (session, mut rx) = connect(&state, &alice);
        state.sessions.subscribe(session.id(), chat_id);

        for content in [json!(""), json!("   "), json!({"kind": "text", "text": "\n"})] {
            let frame =
                json!({"event": "message:send", "data": {"chatId": chat_id, "content": content}});
            process_frame(&state, &session, &frame.to_string()).await;
        }

        assert!(store.history(chat_id).await.unwrap().is_empty());
        assert!(next_event(&mut rx).is_none());
    }

    #[tokio::test]
    async fn test_failed_join_reports_error_and_keeps_session() {
        let (state, _, _, bob, chat_id) = state_with_chat().await;
        let (session, mut rx) = connect(&state, &bob);

        let join = json!({"event": "chat:join", "data": {"chatId": chat_id}}).to_string();
        process_frame(&state, &session, &join).await;

        assert_eq!(
            next_event(&mut rx),
            Some(ServerEvent::Error {
                code: 403,
                message: "You are not a member of this chat".to_string()
            })
        );
        assert!(!state.sessions.is_subscribed(session.id(), chat_id));
        assert!(state.sessions.is_user_online(bob.user_id));
    }

    #[tokio::test]
    async fn test_malformed_frames_are_ignored() {
        let (state, _, alice, _, _) = state_with_chat().await;
        let (session, mut rx) = connect(&state, &alice);

        for frame in ["{ not json", "[1,2,3]", "42", "", r#"{"event":"chat:join"}"#] {
            process_frame(&state, &session, frame).await;
        }
        assert!(next_event(&mut rx).is_none());
        assert_eq!(state.sessions.session_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_image_reports_validation_error() {
        let (state, store, alice, _, chat_id) = state_with_chat().await;
        let (session, mut rx) = connect(&state, &alice);

        let frame = json!({
            "event": "message:send",
            "data": {"chatId": chat_id, "content": {"kind": "image", "payload": "%%%"}}
        });
        process_frame(&state, &session, &frame.to_string()).await;

        assert!(matches!(next_event(&mut rx), Some(ServerEvent::Error { code: 400, .. })));
        assert_eq!(store.message_count().await, 0);
    }
}
