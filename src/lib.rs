//! Client side of the coaching chat service: a reconnecting streaming chat
//! connection, the history/quota HTTP API, and per-screen conversation state.

pub mod api;
pub mod client;
pub mod coach;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod markdown;
pub mod models;
pub mod protocol;
pub mod storage;
pub mod transport;
pub mod usage;

pub use api::ApiClient;
pub use client::{ChatEvents, ChatListener, ConnectionState, StreamingChatClient};
pub use config::ClientConfig;
pub use conversation::Conversation;
pub use errors::ClientError;
pub use models::{ChatMessage, ChatSession, MessageRole, SuggestedOption, ToolType, UsageStatus};
pub use protocol::ChatEvent;
pub use usage::{QuotaDecision, UsageGate};
