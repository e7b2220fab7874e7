use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::models::{ChatMessage, ChatSession, ToolType, UsageStatus};
use crate::storage::{self, Storage};

/// `{code, message, data}` wrapper around every backend response.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

/// Client for the session history and usage quota endpoints.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    storage: Arc<dyn Storage>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, storage: Arc<dyn Storage>) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            storage,
        })
    }

    /// Creates an empty session for `tool_type`.
    pub async fn create_session(&self, tool_type: &ToolType) -> Result<ChatSession, ClientError> {
        let body = serde_json::json!({ "tool_type": tool_type });
        self.request_data(self.build(Method::POST, "/sessions").json(&body), "create session")
            .await
    }

    /// Sessions of the current user, newest first.
    pub async fn get_sessions(&self) -> Result<Vec<ChatSession>, ClientError> {
        self.request_data(self.build(Method::GET, "/sessions"), "list sessions").await
    }

    /// Messages of one session in chronological order.
    pub async fn get_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, ClientError> {
        let path = format!("/sessions/{}/messages", urlencoding::encode(session_id));
        self.request_data(self.build(Method::GET, &path), "list messages").await
    }

    pub async fn check_usage(&self) -> Result<UsageStatus, ClientError> {
        self.request_data(self.build(Method::GET, "/usage/check"), "check usage").await
    }

    pub async fn increment_usage(&self) -> Result<(), ClientError> {
        self.request::<serde_json::Value>(self.build(Method::POST, "/usage/increment"))
            .await
            .map(|_| ())
    }

    fn build(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{path}", self.base_url));
        match storage::token(&*self.storage) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn request_data<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<T, ClientError> {
        self.request(builder).await?.ok_or_else(|| ClientError::Api {
            code: 0,
            message: format!("{what}: response carried no data"),
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Option<T>, ClientError> {
        let resp = builder.send().await.map_err(|e| {
            error!("API request failed: {e}");
            ClientError::Http(e)
        })?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!("API responded {status}");

        let envelope: Envelope<serde_json::Value> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ClientError::Api { code: i64::from(status.as_u16()), message: body });
            }
            Err(e) => return Err(ClientError::Serialization(e)),
        };

        if envelope.code != 0 {
            let message = envelope
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "request failed".to_string());
            return Err(ClientError::Api { code: envelope.code, message });
        }
        match envelope.data {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(data) => Ok(Some(serde_json::from_value(data)?)),
        }
    }
}
