use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::client::{ChatListener, StreamingChatClient};
use crate::errors::ClientError;
use crate::models::{ChatMessage, MessageRole, SuggestedOption, ToolType};
use crate::storage::{Storage, LAST_SESSION_KEY};

/// View state of one chat screen.
///
/// Fed by [`ChatEvents`](crate::client::ChatEvents) through its
/// [`ChatListener`] impl; the streamed reply is buffered in
/// `streaming_text` and becomes one assistant message on `done`.
pub struct Conversation {
    messages: Vec<ChatMessage>,
    streaming_text: String,
    is_streaming: bool,
    session_id: Option<String>,
    tool_type: ToolType,
    greeting: String,
    options: Vec<SuggestedOption>,
    last_error: Option<String>,
    storage: Arc<dyn Storage>,
}

impl Conversation {
    pub fn new(tool_type: ToolType, greeting: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        let greeting = greeting.into();
        Self {
            messages: vec![ChatMessage::new("", MessageRole::Assistant, greeting.clone())],
            streaming_text: String::new(),
            is_streaming: false,
            session_id: None,
            tool_type,
            greeting,
            options: Vec::new(),
            last_error: None,
            storage,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn streaming_text(&self) -> &str {
        &self.streaming_text
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn tool_type(&self) -> &ToolType {
        &self.tool_type
    }

    pub fn options(&self) -> &[SuggestedOption] {
        &self.options
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Records the user's turn and switches to streaming mode.
    pub fn begin_turn(&mut self, text: &str) -> Result<&ChatMessage, ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        if self.is_streaming {
            return Err(ClientError::TurnInProgress);
        }

        let session = self.session_id.clone().unwrap_or_default();
        self.messages.push(ChatMessage::new(session, MessageRole::User, text));
        self.streaming_text.clear();
        self.options.clear();
        self.last_error = None;
        self.is_streaming = true;
        Ok(&self.messages[self.messages.len() - 1])
    }

    /// Starts a turn and writes it to `client`.
    ///
    /// When the write fails the user message stays in the history but the
    /// screen leaves streaming mode.
    pub fn send(&mut self, client: &StreamingChatClient, text: &str) -> Result<(), ClientError> {
        let content = self.begin_turn(text)?.content.clone();
        if let Err(e) = client.send_message(&content, &self.tool_type, self.session_id.as_deref()) {
            error!("Failed to send message: {e}");
            self.is_streaming = false;
            self.last_error = Some(e.to_string());
            return Err(e);
        }
        Ok(())
    }

    /// Ends the current turn with a reply that arrived in one piece.
    pub fn complete_turn(&mut self, reply: String) {
        self.streaming_text.clear();
        self.is_streaming = false;
        if !reply.is_empty() {
            let session = self.session_id.clone().unwrap_or_default();
            self.messages.push(ChatMessage::new(session, MessageRole::Assistant, reply));
        }
    }

    /// Reloads the last persisted session, if any. Returns whether one was restored.
    pub async fn restore(&mut self, api: &ApiClient) -> bool {
        let Some(session_id) = self.storage.get(LAST_SESSION_KEY) else {
            return false;
        };
        match api.get_messages(&session_id).await {
            Ok(history) => {
                info!("Restored session {session_id} ({} messages)", history.len());
                self.messages = history;
                self.session_id = Some(session_id);
                true
            }
            Err(e) => {
                warn!("Failed to load session {session_id}: {e}");
                false
            }
        }
    }

    /// Starts over with a fresh session.
    pub fn reset(&mut self) {
        self.session_id = None;
        self.messages = vec![ChatMessage::new("", MessageRole::Assistant, self.greeting.clone())];
        self.streaming_text.clear();
        self.is_streaming = false;
        self.options.clear();
        self.last_error = None;
        if let Err(e) = self.storage.remove(LAST_SESSION_KEY) {
            warn!("Failed to forget last session: {e}");
        }
    }

    fn remember_session(&mut self, session_id: String) {
        if let Err(e) = self.storage.set(LAST_SESSION_KEY, &session_id) {
            warn!("Failed to persist session {session_id}: {e}");
        }
        self.session_id = Some(session_id);
    }
}

/// Turn events that arrive while no turn is active (for example after
/// [`Conversation::reset`] abandoned one) are dropped.
impl ChatListener for Conversation {
    fn on_chunk(&mut self, text: String) {
        if !self.is_streaming {
            debug!("Ignoring chunk outside an active turn");
            return;
        }
        self.streaming_text.push_str(&text);
    }

    fn on_done(&mut self, session_id: String) {
        if !self.is_streaming {
            debug!("Ignoring done for session {session_id} outside an active turn");
            return;
        }
        let reply = std::mem::take(&mut self.streaming_text);
        if self.session_id.as_deref() != Some(session_id.as_str()) {
            self.remember_session(session_id.clone());
        }
        if !reply.is_empty() {
            self.messages.push(ChatMessage::new(session_id, MessageRole::Assistant, reply));
        }
        self.is_streaming = false;
    }

    fn on_session(&mut self, session_id: String) {
        if !self.is_streaming {
            debug!("Ignoring session {session_id} outside an active turn");
            return;
        }
        self.remember_session(session_id);
    }

    fn on_error(&mut self, message: String) {
        self.last_error = Some(message);
        self.is_streaming = false;
    }

    fn on_options(&mut self, options: Vec<SuggestedOption>) {
        self.options = options;
    }
}
