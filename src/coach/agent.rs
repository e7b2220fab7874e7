use rig::client::Nothing;
use rig::completion::Chat;
use rig::message::Message as RigMessage;
use rig::prelude::CompletionClient;
use rig::providers::ollama;
use tracing::{debug, error};

use super::catalog::COACH_PERSONA;
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::models::{ChatMessage, MessageRole};

/// Turns of history replayed with each request.
const HISTORY_WINDOW: usize = 10;

/// Builds a rig [`RigMessage`] history from the most recent [`ChatMessage`]s.
fn to_rig_history(messages: &[ChatMessage]) -> Vec<RigMessage> {
    let start = messages.len().saturating_sub(HISTORY_WINDOW);
    messages[start..]
        .iter()
        .map(|m| match m.role {
            MessageRole::User => RigMessage::user(&m.content),
            MessageRole::Assistant => RigMessage::assistant(&m.content),
        })
        .collect()
}

/// Non-streaming coach used by the single-shot chat screens.
/// A fresh agent is built per request so each call can carry its own system instruction.
#[derive(Clone)]
pub struct CoachAgent {
    client: ollama::Client,
    base_url: String,
    model: String,
}

impl CoachAgent {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(&config.ollama_base_url)
            .build()
            .map_err(|e| {
                error!("Failed to build coach client: {e}");
                ClientError::CoachUnavailable { host: config.ollama_base_url.clone() }
            })?;
        Ok(Self {
            client,
            base_url: config.ollama_base_url.clone(),
            model: config.model.clone(),
        })
    }

    /// Answers `new_message` given the prior turns.
    ///
    /// `system_instruction` overrides the executive-coach persona, e.g. with a
    /// business tool's instruction.
    pub async fn reply(
        &self,
        history: &[ChatMessage],
        new_message: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, ClientError> {
        let instruction = system_instruction.unwrap_or(COACH_PERSONA.system_instruction);
        let agent = self.client.agent(&self.model).preamble(instruction).build();

        let rig_history = to_rig_history(history);
        debug!("Coach request with {} history turns", rig_history.len());

        let content = agent
            .chat(new_message, rig_history)
            .await
            .map_err(|e| self.classify(e.to_string()))?;

        if content.trim().is_empty() {
            return Err(ClientError::Inference { message: "empty completion".to_string() });
        }
        Ok(content)
    }

    fn classify(&self, msg: String) -> ClientError {
        error!("Coach inference failed: {msg}");
        if msg.contains("Connection refused") || msg.contains("connect") {
            ClientError::CoachUnavailable { host: self.base_url.clone() }
        } else if msg.contains("model") {
            ClientError::ModelNotFound { model_name: self.model.clone() }
        } else {
            ClientError::Inference { message: msg }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| {
                let role = if i % 2 == 0 { MessageRole::User } else { MessageRole::Assistant };
                ChatMessage::new("s1", role, format!("turn {i}"))
            })
            .collect()
    }

    #[test]
    fn test_history_window() {
        assert_eq!(to_rig_history(&turns(4)).len(), 4);
        assert_eq!(to_rig_history(&turns(25)).len(), HISTORY_WINDOW);
        assert!(to_rig_history(&[]).is_empty());
    }

    #[test]
    fn test_error_classification() {
        let agent = CoachAgent::new(&ClientConfig::default()).unwrap();
        assert!(agent.classify("error sending request: Connection refused".into()).is_coach_unavailable());
        assert!(matches!(
            agent.classify("model 'llama3.2' not found".into()),
            ClientError::ModelNotFound { .. }
        ));
        assert!(matches!(agent.classify("bad json".into()), ClientError::Inference { .. }));
    }
}
