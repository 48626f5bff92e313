use std::sync::Arc;

use faultscope_core::{AttemptOutcome, DiagnosisConfig, ModelFallbacks};
use faultscope_llm::{
    CannedModelClient, GeminiClient, GenerationConfig, ModelClient, ModelError, ResponseFormat,
    CANNED_DIAGNOSIS,
};
use httpmock::prelude::*;
use secrecy::SecretString;
use serde_json::json;

const MODEL_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

fn client(server: &MockServer) -> GeminiClient {
    GeminiClient::new(SecretString::new("test-key".to_string())).with_base_url(server.url(""))
}

#[tokio::test]
async fn gemini_invoke_sends_generation_config_and_returns_text() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(MODEL_PATH)
            .header("x-goog-api-key", "test-key")
            .json_body(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "diagnose this"}]}
                ],
                "generationConfig": {
                    "temperature": 0.2,
                    "maxOutputTokens": 2048,
                    "responseMimeType": "application/json"
                }
            }));
        then.status(200).json_body(json!({
            "candidates": [
                {
                    "content": {"parts": [{"text": "{\"summary\":"}, {"text": "\"ok\"}"}]},
                    "finishReason": "STOP"
                }
            ]
        }));
    });

    let text = client(&server)
        .invoke("gemini-1.5-flash", "diagnose this", &GenerationConfig::default())
        .await
        .unwrap();

    assert_eq!(text, "{\"summary\":\"ok\"}");
    mock.assert();
}

#[tokio::test]
async fn gemini_invoke_omits_mime_type_for_text_format() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path(MODEL_PATH).json_body(json!({
            "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
            "generationConfig": {"temperature": 0.2, "maxOutputTokens": 64}
        }));
        then.status(200).json_body(json!({
            "candidates": [{"content": {"parts": [{"text": "hello"}]}}]
        }));
    });
    let config = GenerationConfig {
        max_output_tokens: 64,
        response_format: ResponseFormat::Text,
        ..GenerationConfig::default()
    };

    let text = client(&server)
        .invoke("gemini-1.5-flash", "hi", &config)
        .await
        .unwrap();

    assert_eq!(text, "hello");
    mock.assert();
}

#[tokio::test]
async fn gemini_too_many_requests_is_rate_limited() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(MODEL_PATH);
        then.status(429).json_body(json!({
            "error": {
                "code": 429,
                "message": "Resource has been exhausted (e.g. check quota).",
                "status": "RESOURCE_EXHAUSTED"
            }
        }));
    });

    let err = client(&server)
        .invoke("gemini-1.5-flash", "x", &GenerationConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ModelError::RateLimited(ref message) if message.contains("exhausted")));
}

#[tokio::test]
async fn gemini_server_error_is_transient() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(MODEL_PATH);
        then.status(503).body("upstream overloaded");
    });

    let err = client(&server)
        .invoke("gemini-1.5-flash", "x", &GenerationConfig::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ModelError::Transient("HTTP 503: upstream overloaded".to_string())
    );
}

#[tokio::test]
async fn gemini_auth_failure_is_fatal() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(MODEL_PATH);
        then.status(400).json_body(json!({
            "error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}
        }));
    });

    let err = client(&server)
        .invoke("gemini-1.5-flash", "x", &GenerationConfig::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ModelError::Fatal("HTTP 400: API key not valid.".to_string())
    );
}

#[tokio::test]
async fn gemini_unknown_model_is_transient() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(MODEL_PATH);
        then.status(404).json_body(json!({
            "error": {
                "code": 404,
                "message": "models/gemini-1.5-flash is not found for API version v1beta",
                "status": "NOT_FOUND"
            }
        }));
    });

    let err = client(&server)
        .invoke("gemini-1.5-flash", "x", &GenerationConfig::default())
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert!(matches!(err, ModelError::Transient(ref message) if message.starts_with("HTTP 404")));
}

#[tokio::test]
async fn retired_primary_falls_through_to_the_next_model() {
    let server = MockServer::start();
    let retired = server.mock(|when, then| {
        when.method(POST).path(MODEL_PATH);
        then.status(404).json_body(json!({
            "error": {"code": 404, "message": "model not found", "status": "NOT_FOUND"}
        }));
    });
    let current = server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.0-flash:generateContent");
        then.status(200).json_body(json!({
            "candidates": [{"content": {"parts": [{"text": "{\"ok\":true}"}]}}]
        }));
    });
    let config = DiagnosisConfig::builder()
        .primary_model("gemini-1.5-flash")
        .fallback_models(["gemini-2.0-flash"])
        .build()
        .unwrap();
    let fallbacks = ModelFallbacks::new(Arc::new(client(&server)), &config);

    let completion = fallbacks.run("diagnose this").await.unwrap();

    assert_eq!(completion.model, "gemini-2.0-flash");
    assert_eq!(completion.text, "{\"ok\":true}");
    assert!(matches!(
        completion.attempts[0].outcome,
        AttemptOutcome::TransientError(_)
    ));
    retired.assert_hits(1);
    current.assert_hits(1);
}

#[tokio::test]
async fn gemini_safety_block_is_fatal() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(MODEL_PATH);
        then.status(200).json_body(json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]
        }));
    });

    let err = client(&server)
        .invoke("gemini-1.5-flash", "x", &GenerationConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ModelError::Fatal(_)));
}

#[tokio::test]
async fn gemini_empty_or_unreadable_body_is_transient() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(MODEL_PATH);
        then.status(200).body("<html>gateway</html>");
    });

    let err = client(&server)
        .invoke("gemini-1.5-flash", "x", &GenerationConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ModelError::Transient(_)));
}

#[tokio::test]
async fn gemini_unreachable_host_is_transient_and_hides_the_key() {
    let client = GeminiClient::new(SecretString::new("test-key".to_string()))
        .with_base_url("http://127.0.0.1:1");

    let err = client
        .invoke("gemini-1.5-flash", "x", &GenerationConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ModelError::Transient(_)));
    assert!(!err.to_string().contains("test-key"));
}

#[tokio::test]
async fn canned_client_returns_fixed_diagnosis() {
    let text = CannedModelClient::new()
        .invoke("any-model", "prompt", &GenerationConfig::default())
        .await
        .unwrap();
    assert_eq!(text, CANNED_DIAGNOSIS);
}
