use std::sync::Arc;

use faultscope_core::{
    parse, Adjustment, ClampPolicy, ConfigError, Diagnosis, DiagnosisConfig, ModelClient,
    ModelFallbacks, OrchestratorError, SymptomReport, ValidationError,
};
use faultscope_prompt::DiagnosisPrompt;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnosisOutcome {
    pub diagnosis: Diagnosis,
    pub raw_output: String,
    pub model: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub adjustments: Vec<Adjustment>,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("upstream model unavailable: {source}")]
    UpstreamUnavailable {
        quota_exhausted: bool,
        source: OrchestratorError,
    },
    #[error("model '{model}' returned output that failed validation: {source}")]
    InvalidModelOutput {
        source: ValidationError,
        raw_output: String,
        model: String,
    },
    #[error("diagnosis cancelled")]
    Cancelled,
}

impl ServiceError {
    /// Stable machine-readable name for the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::UpstreamUnavailable {
                quota_exhausted: true,
                ..
            } => "upstream_quota_exhausted",
            ServiceError::UpstreamUnavailable { .. } => "upstream_unavailable",
            ServiceError::InvalidModelOutput { .. } => "invalid_model_output",
            ServiceError::Cancelled => "cancelled",
        }
    }
}

impl From<OrchestratorError> for ServiceError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Cancelled { .. } => ServiceError::Cancelled,
            err => ServiceError::UpstreamUnavailable {
                quota_exhausted: err.quota_exhausted(),
                source: err,
            },
        }
    }
}

/// Stateless diagnosis pipeline: prompt, model fallback, validation.
///
/// Share it behind an `Arc`; every call is independent.
pub struct DiagnosisService {
    prompts: DiagnosisPrompt,
    fallbacks: ModelFallbacks,
    clamp_policy: ClampPolicy,
}

impl DiagnosisService {
    pub fn new(config: DiagnosisConfig, client: Arc<dyn ModelClient>) -> Result<Self, ConfigError> {
        Ok(Self {
            prompts: DiagnosisPrompt::new()?,
            fallbacks: ModelFallbacks::new(client, &config),
            clamp_policy: config.clamp_policy(),
        })
    }

    pub fn with_prompt(mut self, prompts: DiagnosisPrompt) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn models(&self) -> &[String] {
        self.fallbacks.models()
    }

    pub async fn diagnose(&self, report: &SymptomReport) -> Result<DiagnosisOutcome, ServiceError> {
        self.diagnose_with_cancellation(report, &CancellationToken::new())
            .await
    }

    pub async fn diagnose_with_cancellation(
        &self,
        report: &SymptomReport,
        cancellation: &CancellationToken,
    ) -> Result<DiagnosisOutcome, ServiceError> {
        let span = tracing::info_span!(
            "diagnose",
            request_token = %report.request_token(),
            machine_id = report.machine_id().unwrap_or_default(),
        );
        self.run(report, cancellation).instrument(span).await
    }

    async fn run(
        &self,
        report: &SymptomReport,
        cancellation: &CancellationToken,
    ) -> Result<DiagnosisOutcome, ServiceError> {
        if !report.has_symptoms() {
            return Err(ServiceError::InvalidInput(
                "symptoms must not be empty".to_string(),
            ));
        }

        let prompt = self.prompts.build(report);
        let completion = self
            .fallbacks
            .run_with_cancellation(&prompt, cancellation)
            .await?;

        let validated = match parse(&completion.text) {
            Ok(validated) => validated,
            Err(source) => {
                tracing::warn!(model = %completion.model, error = %source, "model output rejected");
                return Err(ServiceError::InvalidModelOutput {
                    source,
                    raw_output: completion.text,
                    model: completion.model,
                });
            }
        };

        let adjustments = match self.clamp_policy {
            ClampPolicy::Warn => {
                for adjustment in &validated.adjustments {
                    tracing::warn!(
                        model = %completion.model,
                        %adjustment,
                        "normalized model output"
                    );
                }
                validated.adjustments
            }
            ClampPolicy::Silent => Vec::new(),
        };

        tracing::info!(
            model = %completion.model,
            attempts = completion.attempts.len(),
            severity = %validated.diagnosis.severity,
            "diagnosis produced"
        );

        Ok(DiagnosisOutcome {
            diagnosis: validated.diagnosis,
            raw_output: validated.raw_output,
            model: completion.model,
            adjustments,
        })
    }
}
