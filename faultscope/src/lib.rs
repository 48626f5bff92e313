//! Turns free-text machine symptom reports into validated failure diagnoses.
//!
//! [`DiagnosisService`] is the entry point: it builds the prompt, walks the
//! configured model revisions until one answers, and validates the answer
//! against the [`Diagnosis`] contract.

mod service;

pub use service::{DiagnosisOutcome, DiagnosisService, ServiceError};

pub use faultscope_core::{
    Adjustment, AdjustmentKind, AttemptOutcome, Category, ClampPolicy, Completion, ConfigError,
    Diagnosis, DiagnosisConfig, DiagnosisConfigBuilder, GenerationConfig, ModelAttempt,
    ModelClient, ModelError, ModelFallbacks, OrchestratorError, ProbableCause, ResponseFormat,
    Severity, SymptomReport, ValidatedDiagnosis, ValidationError, DEFAULT_ATTEMPT_TIMEOUT,
    DEFAULT_MODELS,
};
pub use faultscope_prompt::{DiagnosisPrompt, PromptTemplate};

#[cfg(feature = "gemini")]
pub use faultscope_llm::{CannedModelClient, GeminiClient};
