mod config;
mod diagnosis;
mod error;
mod fallbacks;
mod llm;
mod schema;

pub use config::{
    ClampPolicy, DiagnosisConfig, DiagnosisConfigBuilder, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MODELS,
};
pub use diagnosis::{
    Adjustment, AdjustmentKind, Category, Diagnosis, ProbableCause, Severity, SymptomReport,
    DEFAULT_EQUIPMENT_NAME,
};
pub use error::{ConfigError, ModelError, ValidationError};
pub use fallbacks::{
    AttemptOutcome, Completion, FallbackState, ModelAttempt, ModelFallbacks, OrchestratorError,
};
pub use llm::{GenerationConfig, ModelClient, ResponseFormat, DEFAULT_TEMPERATURE};
pub use schema::{extract_payload, parse, ValidatedDiagnosis};
