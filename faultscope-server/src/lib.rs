//! axum front end for [`faultscope::DiagnosisService`].
//!
//! Routes:
//! - `GET /` liveness probe
//! - `POST /diagnose` symptom report in, validated diagnosis out

pub mod config;
mod error;

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use faultscope::{DiagnosisOutcome, DiagnosisService, SymptomReport};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::ServerArgs;
pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    service: Arc<DiagnosisService>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service: Arc<DiagnosisService>) -> Self {
        Self {
            service,
            shutdown: CancellationToken::new(),
        }
    }

    /// In-flight diagnoses are cancelled when `shutdown` fires.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct DiagnoseRequest {
    #[serde(default)]
    pub symptoms: String,
    #[serde(default, alias = "equipmentName")]
    pub equipment_name: Option<String>,
    #[serde(default, alias = "machineId")]
    pub machine_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, Value>>,
}

impl From<DiagnoseRequest> for SymptomReport {
    fn from(request: DiagnoseRequest) -> Self {
        let mut report = SymptomReport::new(request.symptoms);
        if let Some(equipment_name) = request.equipment_name {
            report = report.with_equipment_name(equipment_name);
        }
        if let Some(machine_id) = request.machine_id {
            report = report.with_machine_id(machine_id);
        }
        if let Some(metadata) = request.metadata {
            report = report.with_metadata(metadata);
        }
        report
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/diagnose", post(diagnose))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn diagnose(
    State(state): State<AppState>,
    payload: Result<Json<DiagnoseRequest>, JsonRejection>,
) -> Result<Json<DiagnosisOutcome>, ApiError> {
    let Json(request) = payload?;
    let report = SymptomReport::from(request);
    let outcome = state
        .service
        .diagnose_with_cancellation(&report, &state.shutdown)
        .await?;
    Ok(Json(outcome))
}
