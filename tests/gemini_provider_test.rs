// Gemini provider against a mock Generative Language API

use mockito::Matcher;
use serde_json::json;
use std::time::Duration;

use birdie_relay::conversation::Turn;
use birdie_relay::providers::{GeminiProvider, LlmProvider, ProviderRequest};

fn provider(server: &mockito::ServerGuard) -> GeminiProvider {
    GeminiProvider::with_timeout("test-key".to_string(), Duration::from_secs(5))
        .unwrap()
        .with_base_url(server.url())
}

fn request() -> ProviderRequest {
    ProviderRequest::new(vec![Turn::user("How many wins?")])
        .with_system("You are Birdie.")
        .with_max_tokens(200)
}

#[tokio::test]
async fn test_generate_content_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::PartialJson(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "How many wins?" }] }],
            "systemInstruction": { "parts": [{ "text": "You are Birdie." }] },
            "generationConfig": { "maxOutputTokens": 200 }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "Jane has 3 wins." }] },
                    "finishReason": "STOP"
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let response = provider(&server).send_message(&request()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.first_text(), Some("Jane has 3 wins."));
    assert_eq!(response.model, "gemini-2.5-flash");
    assert_eq!(response.provider, "gemini");
}

#[tokio::test]
async fn test_api_key_never_in_url() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .match_query(Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"candidates": []}"#)
        .create_async()
        .await;

    let response = provider(&server).send_message(&request()).await.unwrap();

    mock.assert_async().await;
    assert!(response.candidates.is_empty());
    assert_eq!(response.first_text(), None);
}

#[tokio::test]
async fn test_quota_error_carries_api_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .with_status(429)
        .with_body(
            json!({
                "error": { "code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED" }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let err = provider(&server).send_message(&request()).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("429"), "got: {message}");
    assert!(message.contains("Resource has been exhausted"), "got: {message}");
    assert!(!message.contains("test-key"));
}

#[tokio::test]
async fn test_malformed_body_is_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/models/gemini-2.5-flash:generateContent")
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create_async()
        .await;

    assert!(provider(&server).send_message(&request()).await.is_err());
}

#[tokio::test]
async fn test_request_model_overrides_default() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-pro:generateContent")
        .with_status(200)
        .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "ok"}]}}]}"#)
        .create_async()
        .await;

    let response = provider(&server)
        .send_message(&request().with_model("gemini-pro"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.first_text(), Some("ok"));
}

#[tokio::test]
async fn test_check_model() {
    let mut server = mockito::Server::new_async().await;
    let ok = server
        .mock("GET", "/models/gemini-2.5-flash")
        .match_header("x-goog-api-key", "test-key")
        .with_status(200)
        .with_body(r#"{"name": "models/gemini-2.5-flash"}"#)
        .create_async()
        .await;

    provider(&server).check_model().await.unwrap();
    ok.assert_async().await;

    server
        .mock("GET", "/models/no-such-model")
        .with_status(404)
        .with_body(r#"{"error": {"code": 404, "message": "model not found"}}"#)
        .create_async()
        .await;

    let err = provider(&server)
        .with_model("no-such-model")
        .check_model()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("model not found"));
}
