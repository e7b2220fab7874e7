//! Wire frames exchanged with the chat backend over the streaming transport.
//!
//! Client → server:
//! - `{ "message": "...", "tool_type": "...", "session_id": "...|null" }`
//! - `{ "type": "ping" }`
//!
//! Server → client (tagged by `type`):
//! - `{ "type": "chunk",   "content": "..." }` (repeated)
//! - `{ "type": "session", "sessionId": "..." }`
//! - `{ "type": "done",    "sessionId": "..." }`
//! - `{ "type": "error",   "error": "..." }`
//! - `{ "type": "options", "options": [...] }`

use serde::{Deserialize, Serialize};

use crate::errors::ClientError;
use crate::models::{SuggestedOption, ToolType};

const UNKNOWN_ERROR: &str = "unknown error";

/// Chat request written by `send_message`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatRequestFrame {
    pub message: String,
    pub tool_type: ToolType,
    pub session_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlFrame {
    Ping,
}

/// Frame received from the server.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundFrame {
    Chunk {
        #[serde(default)]
        content: String,
    },
    Done {
        #[serde(rename = "sessionId", default)]
        session_id: String,
    },
    Session {
        #[serde(rename = "sessionId", default)]
        session_id: String,
    },
    Error {
        #[serde(default)]
        error: Option<String>,
    },
    Options {
        #[serde(default)]
        options: Vec<SuggestedOption>,
    },
    Pong,
}

/// Event handed to the UI layer, one per meaningful inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatEvent {
    Chunk(String),
    Done { session_id: String },
    Session { session_id: String },
    Error(String),
    Options(Vec<SuggestedOption>),
}

impl ChatRequestFrame {
    pub fn to_json(&self) -> Result<String, ClientError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ControlFrame {
    pub fn to_json(&self) -> Result<String, ClientError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Parses one text frame into the event it carries.
///
/// `Ok(None)` means the frame was valid but carries nothing for the UI
/// (`pong`). Frames whose required payload is empty are protocol errors.
pub fn decode_frame(text: &str) -> Result<Option<ChatEvent>, ClientError> {
    let frame: InboundFrame = serde_json::from_str(text).map_err(|e| ClientError::Protocol {
        message: format!("{e}: {text}"),
    })?;

    let event = match frame {
        InboundFrame::Chunk { content } if content.is_empty() => {
            return Err(protocol("chunk frame without content"));
        }
        InboundFrame::Chunk { content } => ChatEvent::Chunk(content),
        InboundFrame::Done { session_id } if session_id.is_empty() => {
            return Err(protocol("done frame without sessionId"));
        }
        InboundFrame::Done { session_id } => ChatEvent::Done { session_id },
        InboundFrame::Session { session_id } if session_id.is_empty() => {
            return Err(protocol("session frame without sessionId"));
        }
        InboundFrame::Session { session_id } => ChatEvent::Session { session_id },
        InboundFrame::Error { error } => ChatEvent::Error(
            error.filter(|e| !e.is_empty()).unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        ),
        InboundFrame::Options { options } => ChatEvent::Options(options),
        InboundFrame::Pong => return Ok(None),
    };
    Ok(Some(event))
}

fn protocol(message: &str) -> ClientError {
    ClientError::Protocol { message: message.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_frame_shape() {
        let frame = ChatRequestFrame {
            message: "hello".into(),
            tool_type: ToolType::FreeChat,
            session_id: None,
        };
        let value: serde_json::Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "message": "hello", "tool_type": "free_chat", "session_id": null })
        );
    }

    #[test]
    fn test_ping_frame_shape() {
        assert_eq!(ControlFrame::Ping.to_json().unwrap(), r#"{"type":"ping"}"#);
    }

    #[test]
    fn test_decode_known_frames() {
        assert_eq!(
            decode_frame(r#"{"type":"chunk","content":"Hi "}"#).unwrap(),
            Some(ChatEvent::Chunk("Hi ".into()))
        );
        assert_eq!(
            decode_frame(r#"{"type":"done","sessionId":"s1"}"#).unwrap(),
            Some(ChatEvent::Done { session_id: "s1".into() })
        );
        assert_eq!(
            decode_frame(r#"{"type":"session","sessionId":"s1"}"#).unwrap(),
            Some(ChatEvent::Session { session_id: "s1".into() })
        );
        assert_eq!(
            decode_frame(r#"{"type":"error","error":"quota exceeded"}"#).unwrap(),
            Some(ChatEvent::Error("quota exceeded".into()))
        );
    }

    #[test]
    fn test_error_without_message_gets_default() {
        assert_eq!(
            decode_frame(r#"{"type":"error"}"#).unwrap(),
            Some(ChatEvent::Error(UNKNOWN_ERROR.into()))
        );
    }

    #[test]
    fn test_options_frame() {
        let event = decode_frame(
            r#"{"type":"options","options":[{"id":"1","label":"Go deeper","value":"why?"}]}"#,
        )
        .unwrap();
        match event {
            Some(ChatEvent::Options(opts)) => {
                assert_eq!(opts.len(), 1);
                assert_eq!(opts[0].value, "why?");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_pong_is_silent() {
        assert_eq!(decode_frame(r#"{"type":"pong"}"#).unwrap(), None);
    }

    #[test]
    fn test_malformed_frames_are_protocol_errors() {
        for text in [
            "not json",
            r#"{"type":"telemetry"}"#,
            r#"{"content":"no tag"}"#,
            r#"{"type":"chunk"}"#,
            r#"{"type":"done"}"#,
            r#"{"type":"session","sessionId":""}"#,
        ] {
            assert!(
                matches!(decode_frame(text), Err(ClientError::Protocol { .. })),
                "expected protocol error for {text}"
            );
        }
    }
}
