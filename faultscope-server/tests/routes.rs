use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use faultscope::{
    CannedModelClient, DiagnosisConfig, DiagnosisService, GenerationConfig, ModelClient,
    ModelError,
};
use faultscope_server::{router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

struct FailingClient(ModelError);

#[async_trait]
impl ModelClient for FailingClient {
    async fn invoke(
        &self,
        _model: &str,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<String, ModelError> {
        Err(self.0.clone())
    }
}

fn app_with(client: Arc<dyn ModelClient>) -> Router {
    let service = DiagnosisService::new(DiagnosisConfig::default(), client).unwrap();
    router(AppState::new(Arc::new(service)))
}

fn post_json(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/diagnose")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app_with(Arc::new(CannedModelClient::new()));
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn diagnose_returns_validated_diagnosis() {
    let app = app_with(Arc::new(CannedModelClient::new()));

    let (status, body) = send(
        app,
        post_json(json!({
            "symptoms": "excessive vibration and rising motor temperature",
            "equipment_name": "Pump 7",
            "machine_id": "M-1234",
            "metadata": {"line": 3}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["diagnosis"]["severity"], "high");
    assert_eq!(body["diagnosis"]["confidence"], 0.85);
    assert_eq!(body["diagnosis"]["probable_causes"][0]["likelihood"], 70);
    assert_eq!(body["model"], "gemini-2.5-flash");
    assert!(body["raw_output"].as_str().unwrap().starts_with('{'));
    assert!(body.get("adjustments").is_none());
}

#[tokio::test]
async fn camel_case_request_fields_are_accepted() {
    let app = app_with(Arc::new(CannedModelClient::new()));

    let (status, _) = send(
        app,
        post_json(json!({
            "symptoms": "grinding noise",
            "equipmentName": "Conveyor 2",
            "machineId": "C-2"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_or_blank_symptoms_are_bad_requests() {
    for body in [json!({}), json!({"symptoms": "  "}), json!({"symptoms": 42})] {
        let app = app_with(Arc::new(CannedModelClient::new()));

        let (status, body) = send(app, post_json(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "invalid_input");
    }
}

#[tokio::test]
async fn malformed_json_body_is_a_bad_request() {
    let app = app_with(Arc::new(CannedModelClient::new()));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/diagnose")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_input");
}

#[tokio::test]
async fn quota_exhaustion_is_service_unavailable() {
    let app = app_with(Arc::new(FailingClient(ModelError::RateLimited(
        "HTTP 429".to_string(),
    ))));

    let (status, body) = send(app, post_json(json!({"symptoms": "overheating"}))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["kind"], "upstream_quota_exhausted");
}

#[tokio::test]
async fn provider_failure_is_service_unavailable() {
    let app = app_with(Arc::new(FailingClient(ModelError::Transient(
        "HTTP 503".to_string(),
    ))));

    let (status, body) = send(app, post_json(json!({"symptoms": "overheating"}))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["kind"], "upstream_unavailable");
}

#[tokio::test]
async fn unusable_model_output_is_bad_gateway() {
    let app = app_with(Arc::new(CannedModelClient::with_response(
        "The motor is fine, nothing to report.",
    )));

    let (status, body) = send(app, post_json(json!({"symptoms": "overheating"}))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["kind"], "invalid_model_output");
    assert!(body.get("diagnosis").is_none());
}

#[tokio::test]
async fn shutdown_cancels_pending_diagnoses() {
    let service =
        DiagnosisService::new(DiagnosisConfig::default(), Arc::new(CannedModelClient::new()))
            .unwrap();
    let shutdown = CancellationToken::new();
    shutdown.cancel();
    let app = router(AppState::new(Arc::new(service)).with_shutdown(shutdown));

    let (status, body) = send(app, post_json(json!({"symptoms": "overheating"}))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["kind"], "cancelled");
}
