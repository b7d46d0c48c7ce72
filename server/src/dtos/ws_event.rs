//! WebSocket Event DTOs - Data Transfer Objects per eventi WebSocket
//!
//! Ogni frame è un oggetto JSON `{ "event": <nome>, "data": <payload> }`.

use crate::core::AppError;
use crate::dtos::{ChatDTO, MessageContent, MessageDTO};
use serde::{Deserialize, Serialize};

/// Eventi in ingresso dal client
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "chat:join")]
    JoinChat(JoinChatDTO),
    #[serde(rename = "message:send")]
    SendMessage(SendMessageDTO),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JoinChatDTO {
    pub chat_id: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageDTO {
    pub chat_id: i32,
    pub content: ContentDTO,
}

/// Message content as it arrives on the wire: either a bare string or a
/// structured object tagged by `kind`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum ContentDTO {
    Plain(String),
    Structured(StructuredContentDTO),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StructuredContentDTO {
    Text {
        text: String,
    },
    Image {
        payload: String,
        #[serde(default)]
        text: Option<String>,
    },
}

impl ContentDTO {
    /// Validates the wire shape. `Ok(None)` means there is nothing to send.
    pub fn into_content(self) -> Result<Option<MessageContent>, AppError> {
        match self {
            ContentDTO::Plain(text) | ContentDTO::Structured(StructuredContentDTO::Text { text }) => {
                Ok(MessageContent::text(text))
            }
            ContentDTO::Structured(StructuredContentDTO::Image { payload, text }) => {
                MessageContent::image(payload, text)
            }
        }
    }
}

/// Eventi in uscita verso il client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "message:new")]
    NewMessage(MessageDTO),
    #[serde(rename = "chat:new")]
    NewChat(ChatDTO),
    #[serde(rename = "error")]
    Error { code: u16, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::MessageKind;
    use serde_json::json;

    #[test]
    fn test_parse_join() {
        let event: ClientEvent =
            serde_json::from_value(json!({"event": "chat:join", "data": {"chatId": 7}})).unwrap();
        match event {
            ClientEvent::JoinChat(join) => assert_eq!(join.chat_id, 7),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_parse_send_plain_and_structured() {
        let plain: ClientEvent = serde_json::from_value(
            json!({"event": "message:send", "data": {"chatId": 1, "content": "hi"}}),
        )
        .unwrap();
        let ClientEvent::SendMessage(send) = plain else {
            panic!("expected message:send");
        };
        assert_eq!(
            send.content.into_content().unwrap(),
            Some(MessageContent::Text("hi".to_string()))
        );

        let image: ClientEvent = serde_json::from_value(json!({
            "event": "message:send",
            "data": {"chatId": 1, "content": {"kind": "image", "payload": "aGVsbG8="}}
        }))
        .unwrap();
        let ClientEvent::SendMessage(send) = image else {
            panic!("expected message:send");
        };
        let content = send.content.into_content().unwrap().unwrap();
        assert_eq!(content.kind(), MessageKind::Image);
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let parsed = serde_json::from_value::<ClientEvent>(
            json!({"event": "chat:leave", "data": {"chatId": 1}}),
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_server_event_shape() {
        let value = serde_json::to_value(ServerEvent::NewChat(ChatDTO {
            id: 3,
            name: None,
        }))
        .unwrap();
        assert_eq!(value, json!({"event": "chat:new", "data": {"id": 3, "name": null}}));

        let value = serde_json::to_value(ServerEvent::Error {
            code: 403,
            message: "nope".to_string(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"event": "error", "data": {"code": 403, "message": "nope"}})
        );
    }
}
