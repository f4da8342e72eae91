//! Integration tests for the chat-completions client against a mock endpoint.

use std::time::Duration;

use gitlog::config::Settings;
use gitlog::error::CompletionError;
use gitlog::llm::{
    ApiCredential, CompletionClient, CompletionProvider, CompletionRequest, ResponseFormat,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer, api_key: Option<&str>) -> Settings {
    Settings {
        api_key: api_key.map(str::to_string),
        base_url: server.uri(),
        completion_timeout: Duration::from_secs(5),
        ..Settings::default()
    }
}

fn request() -> CompletionRequest {
    CompletionRequest {
        system: "You are terse.".to_string(),
        user: "Say hi".to_string(),
        response_format: None,
        temperature: 0.3,
        max_tokens: Some(2500),
        model: "test-model".to_string(),
        credential: None,
    }
}

fn answer(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

#[tokio::test]
async fn test_sends_chat_request_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer hosted-key"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "max_tokens": 2500,
            "messages": [
                { "role": "system", "content": "You are terse." },
                { "role": "user", "content": "Say hi" }
            ]
        })))
        .respond_with(answer("  hi  "))
        .expect(1)
        .mount(&server)
        .await;

    let client = CompletionClient::new(&settings(&server, Some("hosted-key"))).unwrap();
    let text = client.complete(request()).await.unwrap();

    assert_eq!(text, "hi");
}

#[tokio::test]
async fn test_json_mode_is_requested() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "response_format": { "type": "json_object" } })))
        .respond_with(answer(r#"{"lines":[]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = CompletionClient::new(&settings(&server, Some("hosted-key"))).unwrap();
    let text = client
        .complete(CompletionRequest {
            response_format: Some(ResponseFormat::JsonObject),
            ..request()
        })
        .await
        .unwrap();

    assert_eq!(text, r#"{"lines":[]}"#);
}

#[tokio::test]
async fn test_request_credential_overrides_endpoint() {
    let hosted = MockServer::start().await;
    let byok = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(answer("hosted"))
        .expect(0)
        .mount(&hosted)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-user"))
        .respond_with(answer("byok"))
        .expect(1)
        .mount(&byok)
        .await;

    let client = CompletionClient::new(&settings(&hosted, Some("hosted-key"))).unwrap();
    let text = client
        .complete(CompletionRequest {
            credential: Some(ApiCredential {
                api_key: "sk-user".to_string(),
                base_url: format!("{}/v1/", byok.uri()),
            }),
            ..request()
        })
        .await
        .unwrap();

    assert_eq!(text, "byok");
}

#[tokio::test]
async fn test_missing_key_fails_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(answer("unreachable"))
        .expect(0)
        .mount(&server)
        .await;

    let client = CompletionClient::new(&settings(&server, None)).unwrap();
    let result = client.complete(request()).await;

    assert!(matches!(result, Err(CompletionError::MissingApiKey)));
}

#[tokio::test]
async fn test_transient_status_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(answer("recovered"))
        .expect(1)
        .mount(&server)
        .await;

    let client = CompletionClient::new(&settings(&server, Some("hosted-key"))).unwrap();
    let text = client.complete(request()).await.unwrap();

    assert_eq!(text, "recovered");
}

#[tokio::test]
async fn test_rate_limit_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(3)
        .mount(&server)
        .await;

    let client = CompletionClient::new(&settings(&server, Some("hosted-key"))).unwrap();
    let result = client.complete(request()).await;

    match result {
        Err(CompletionError::RetriesExhausted(inner)) => {
            assert!(matches!(*inner, CompletionError::Status { status: 429, .. }));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = CompletionClient::new(&settings(&server, Some("hosted-key"))).unwrap();
    let result = client.complete(request()).await;

    match result {
        Err(CompletionError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid key");
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_content_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(answer("   "))
        .mount(&server)
        .await;

    let client = CompletionClient::new(&settings(&server, Some("hosted-key"))).unwrap();
    let result = client.complete(request()).await;

    assert!(matches!(result, Err(CompletionError::EmptyResponse)));
}
