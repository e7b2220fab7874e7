use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MessageRole {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" | "model" => Ok(MessageRole::Assistant),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// Which coaching flow a session belongs to.
///
/// Values the backend invents later are carried through as [`ToolType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolType {
    FreeChat,
    Swot,
    Smart,
    Decision,
    Matrix,
    FiveWhy,
    Other(String),
}

impl ToolType {
    pub fn as_str(&self) -> &str {
        match self {
            ToolType::FreeChat => "free_chat",
            ToolType::Swot => "swot",
            ToolType::Smart => "smart",
            ToolType::Decision => "decision",
            ToolType::Matrix => "matrix",
            ToolType::FiveWhy => "5why",
            ToolType::Other(s) => s,
        }
    }
}

impl Default for ToolType {
    fn default() -> Self {
        ToolType::FreeChat
    }
}

impl From<String> for ToolType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "free_chat" => ToolType::FreeChat,
            "swot" => ToolType::Swot,
            "smart" => ToolType::Smart,
            "decision" => ToolType::Decision,
            "matrix" => ToolType::Matrix,
            "5why" => ToolType::FiveWhy,
            _ => ToolType::Other(s),
        }
    }
}

impl From<&str> for ToolType {
    fn from(s: &str) -> Self {
        ToolType::from(s.to_string())
    }
}

impl From<ToolType> for String {
    fn from(t: ToolType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for ToolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of a conversation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    #[serde(default)]
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(session_id: impl Into<String>, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub tool_type: ToolType,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, rename = "firstMessage", skip_serializing_if = "Option::is_none")]
    pub first_message_preview: Option<String>,
}

/// A quick-reply suggestion pushed by the backend in an `options` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedOption {
    pub id: String,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStatus {
    pub remaining: i64,
    pub total: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_remaining: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchased_remaining: Option<i64>,
}

/// Backend timestamps are ISO-8601, sometimes without an offset.
/// Offset-less values are taken as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_with_naive_timestamp() {
        let json = r#"{"id":"m1","sessionId":"s1","role":"assistant","content":"hi","createdAt":"2025-03-01T08:30:00.123456"}"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.session_id, "s1");
        assert_eq!(msg.created_at.to_rfc3339(), "2025-03-01T08:30:00.123456+00:00");
    }

    #[test]
    fn test_message_with_offset_timestamp() {
        let json = r#"{"id":"m1","role":"user","content":"hi","createdAt":"2025-03-01T08:30:00+08:00"}"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.session_id, "");
        assert_eq!(msg.created_at.to_rfc3339(), "2025-03-01T00:30:00+00:00");
    }

    #[test]
    fn test_session_first_message_preview() {
        let json = r#"{"id":"7","userId":"u1","toolType":"5why","createdAt":"2025-03-01T08:30:00","firstMessage":"新对话"}"#;
        let session: ChatSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.tool_type, ToolType::FiveWhy);
        assert_eq!(session.first_message_preview.as_deref(), Some("新对话"));
    }

    #[test]
    fn test_unknown_tool_type_is_preserved() {
        let tool: ToolType = serde_json::from_str(r#""okr""#).unwrap();
        assert_eq!(tool, ToolType::Other("okr".into()));
        assert_eq!(serde_json::to_string(&tool).unwrap(), r#""okr""#);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(MessageRole::try_from("USER".to_string()), Ok(MessageRole::User));
        assert_eq!(MessageRole::try_from("model".to_string()), Ok(MessageRole::Assistant));
        assert!(MessageRole::try_from("system".to_string()).is_err());
    }
}
