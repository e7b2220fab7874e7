//! HTTP API, usage gate and session restore against a mocked backend.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use coach_chat::storage::{save_login, MemoryStorage, Storage, LAST_SESSION_KEY};
use coach_chat::{
    ApiClient, ClientConfig, ClientError, Conversation, MessageRole, QuotaDecision, ToolType,
    UsageGate,
};

fn envelope(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "message": "success", "data": data }))
}

async fn setup() -> (MockServer, ApiClient, Arc<MemoryStorage>) {
    let server = MockServer::start().await;
    let storage = Arc::new(MemoryStorage::new());
    save_login(&*storage, "tok", "u1").unwrap();
    let config = ClientConfig {
        api_base_url: format!("{}/api/", server.uri()),
        ..ClientConfig::default()
    };
    let api = ApiClient::new(&config, storage.clone()).unwrap();
    (server, api, storage)
}

#[tokio::test]
async fn test_get_sessions_sends_bearer_token() {
    let (server, api, _) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/sessions"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(envelope(json!([
            { "id": "2", "userId": "u1", "toolType": "swot", "createdAt": "2025-03-02T09:00:00", "firstMessage": "Our market share is falling" },
            { "id": "1", "userId": "u1", "toolType": "free_chat", "createdAt": "2025-03-01T09:00:00" }
        ])))
        .mount(&server)
        .await;

    let sessions = api.get_sessions().await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].tool_type, ToolType::Swot);
    assert_eq!(sessions[0].first_message_preview.as_deref(), Some("Our market share is falling"));
    assert_eq!(sessions[1].first_message_preview, None);
}

#[tokio::test]
async fn test_create_session_posts_tool_type() {
    let (server, api, _) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/sessions"))
        .and(body_json(json!({ "tool_type": "5why" })))
        .respond_with(envelope(json!(
            { "id": "9", "userId": "u1", "toolType": "5why", "createdAt": "2025-03-02T09:00:00.5" }
        )))
        .mount(&server)
        .await;

    let session = api.create_session(&ToolType::FiveWhy).await.unwrap();
    assert_eq!(session.id, "9");
    assert_eq!(session.user_id, "u1");
}

#[tokio::test]
async fn test_application_error_code() {
    let (server, api, _) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/usage/check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 1, "message": "user not found" })))
        .mount(&server)
        .await;

    match api.check_usage().await {
        Err(ClientError::Api { code, message }) => {
            assert_eq!(code, 1);
            assert_eq!(message, "user not found");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_without_envelope() {
    let (server, api, _) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/sessions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    match api.get_sessions().await {
        Err(ClientError::Api { code, message }) => {
            assert_eq!(code, 401);
            assert_eq!(message, "unauthorized");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_increment_accepts_missing_data() {
    let (server, api, _) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/usage/increment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "message": "success" })))
        .expect(1)
        .mount(&server)
        .await;

    api.increment_usage().await.unwrap();
}

#[tokio::test]
async fn test_null_message_is_accepted() {
    let (server, api, _) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "message": null, "data": [] })))
        .mount(&server)
        .await;

    assert!(api.get_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_null_message_on_error_code() {
    let (server, api, _) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/usage/check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 7, "message": null })))
        .mount(&server)
        .await;

    match api.check_usage().await {
        Err(ClientError::Api { code, message }) => {
            assert_eq!(code, 7);
            assert_eq!(message, "request failed");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_usage_gate_decisions() {
    let (server, api, _) = setup().await;
    let gate = UsageGate::new(api);

    Mock::given(method("GET"))
        .and(path("/api/usage/check"))
        .respond_with(envelope(json!({ "remaining": 0, "total": 10, "daily_remaining": 0, "purchased_remaining": 0 })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    assert_eq!(gate.check().await, QuotaDecision::Exhausted { total: 10 });

    Mock::given(method("GET"))
        .and(path("/api/usage/check"))
        .respond_with(envelope(json!({ "remaining": 3, "total": 10 })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    assert_eq!(gate.check().await, QuotaDecision::Allowed { remaining: Some(3) });

    Mock::given(method("GET"))
        .and(path("/api/usage/check"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let decision = gate.check().await;
    assert_eq!(decision, QuotaDecision::Allowed { remaining: None });
    assert!(decision.is_allowed());
}

#[tokio::test]
async fn test_usage_record_swallows_failures() {
    let (server, api, _) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/usage/increment"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    UsageGate::new(api).record().await;
}

#[tokio::test]
async fn test_restore_last_session() {
    let (server, api, storage) = setup().await;
    storage.set(LAST_SESSION_KEY, "s7").unwrap();
    Mock::given(method("GET"))
        .and(path("/api/sessions/s7/messages"))
        .respond_with(envelope(json!([
            { "id": "1", "sessionId": "s7", "role": "user", "content": "hello", "createdAt": "2025-03-01T09:00:00" },
            { "id": "2", "sessionId": "s7", "role": "assistant", "content": "Hi there", "createdAt": "2025-03-01T09:00:05" }
        ])))
        .mount(&server)
        .await;

    let mut convo = Conversation::new(ToolType::FreeChat, "greeting", storage.clone());
    assert!(convo.restore(&api).await);
    assert_eq!(convo.session_id(), Some("s7"));
    assert_eq!(convo.messages().len(), 2);
    assert_eq!(convo.messages()[1].role, MessageRole::Assistant);
}

#[tokio::test]
async fn test_restore_failure_keeps_greeting() {
    let (server, api, storage) = setup().await;
    storage.set(LAST_SESSION_KEY, "gone").unwrap();
    Mock::given(method("GET"))
        .and(path("/api/sessions/gone/messages"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let mut convo = Conversation::new(ToolType::FreeChat, "greeting", storage.clone());
    assert!(!convo.restore(&api).await);
    assert_eq!(convo.session_id(), None);
    assert_eq!(convo.messages()[0].content, "greeting");
}
