use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "http://localhost:8000/api";
const DEFAULT_WS_BASE: &str = "ws://localhost:8000/ws";
const DEFAULT_OLLAMA_BASE: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2";

/// Endpoints and timings shared by the streaming client, the HTTP API and the coach agent.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub ws_base_url: String,
    pub http_timeout: Duration,
    pub connect_timeout: Duration,
    pub reconnect_delay: Duration,
    pub keepalive_interval: Duration,
    pub storage_path: Option<PathBuf>,
    pub ollama_base_url: String,
    pub model: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            ws_base_url: DEFAULT_WS_BASE.to_string(),
            http_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(3),
            keepalive_interval: Duration::from_secs(30),
            storage_path: None,
            ollama_base_url: DEFAULT_OLLAMA_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Reads overrides from `COACH_*` / `OLLAMA_API_BASE_URL` environment variables.
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        Self {
            api_base_url: lookup("COACH_API_BASE_URL").unwrap_or(defaults.api_base_url),
            ws_base_url: lookup("COACH_WS_URL").unwrap_or(defaults.ws_base_url),
            http_timeout: secs("COACH_HTTP_TIMEOUT_SECS", defaults.http_timeout),
            connect_timeout: secs("COACH_CONNECT_TIMEOUT_SECS", defaults.connect_timeout),
            reconnect_delay: secs("COACH_RECONNECT_DELAY_SECS", defaults.reconnect_delay),
            keepalive_interval: secs("COACH_KEEPALIVE_SECS", defaults.keepalive_interval),
            storage_path: lookup("COACH_STORAGE_PATH").map(PathBuf::from),
            ollama_base_url: lookup("OLLAMA_API_BASE_URL").unwrap_or(defaults.ollama_base_url),
            model: lookup("COACH_MODEL").unwrap_or(defaults.model),
        }
    }

    /// WebSocket URL of the chat endpoint for `user_id`.
    pub fn chat_ws_url(&self, user_id: &str) -> String {
        format!(
            "{}/chat?user_id={}",
            self.ws_base_url.trim_end_matches('/'),
            urlencoding::encode(user_id)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.reconnect_delay, Duration::from_secs(3));
        assert_eq!(cfg.keepalive_interval, Duration::from_secs(30));
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
        assert_eq!(cfg.chat_ws_url("u1"), "ws://localhost:8000/ws/chat?user_id=u1");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("COACH_WS_URL", "wss://coach.example.com/ws/"),
            ("COACH_RECONNECT_DELAY_SECS", "5"),
            ("COACH_KEEPALIVE_SECS", "not a number"),
        ]);
        let cfg = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.reconnect_delay, Duration::from_secs(5));
        assert_eq!(cfg.keepalive_interval, Duration::from_secs(30));
        assert_eq!(cfg.chat_ws_url("u1"), "wss://coach.example.com/ws/chat?user_id=u1");
    }

    #[test]
    fn test_user_id_is_percent_encoded() {
        let cfg = ClientConfig::default();
        assert_eq!(
            cfg.chat_ws_url("a&b #1"),
            "ws://localhost:8000/ws/chat?user_id=a%26b%20%231"
        );
    }
}
