use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{DiagnosisConfig, GenerationConfig, ModelClient, ModelError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(String),
    RateLimited(String),
    TransientError(String),
    FatalError(String),
}

impl From<ModelError> for AttemptOutcome {
    fn from(error: ModelError) -> Self {
        match error {
            ModelError::RateLimited(detail) => AttemptOutcome::RateLimited(detail),
            ModelError::Transient(detail) => AttemptOutcome::TransientError(detail),
            ModelError::Fatal(detail) => AttemptOutcome::FatalError(detail),
        }
    }
}

/// One call to one model during a fallback run.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelAttempt {
    pub model: String,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

impl ModelAttempt {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::RateLimited(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FallbackState {
    Trying(usize),
    Succeeded(String),
    Exhausted,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    /// Model that produced `text`.
    pub model: String,
    pub text: String,
    pub attempts: Vec<ModelAttempt>,
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("all models exhausted after {} attempt(s)", attempts.len())]
    Exhausted { attempts: Vec<ModelAttempt> },
    #[error("cancelled after {} attempt(s)", attempts.len())]
    Cancelled { attempts: Vec<ModelAttempt> },
}

impl OrchestratorError {
    pub fn attempts(&self) -> &[ModelAttempt] {
        match self {
            OrchestratorError::Exhausted { attempts }
            | OrchestratorError::Cancelled { attempts } => attempts,
        }
    }

    /// True when every model refused the request for quota reasons, as opposed
    /// to failing outright.
    pub fn quota_exhausted(&self) -> bool {
        let attempts = self.attempts();
        matches!(self, OrchestratorError::Exhausted { .. })
            && !attempts.is_empty()
            && attempts.iter().all(ModelAttempt::is_rate_limited)
    }
}

/// Drives a [`ModelClient`] across an ordered list of model revisions.
///
/// Rate-limited and transient failures move on to the next model straight
/// away; a fatal failure or the end of the list ends the run. Each model is
/// called at most once.
pub struct ModelFallbacks {
    client: Arc<dyn ModelClient>,
    models: Vec<String>,
    generation: GenerationConfig,
    attempt_timeout: Duration,
}

impl ModelFallbacks {
    pub fn new(client: Arc<dyn ModelClient>, config: &DiagnosisConfig) -> Self {
        Self {
            client,
            models: config.models().to_vec(),
            generation: config.generation().clone(),
            attempt_timeout: config.attempt_timeout(),
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub async fn run(&self, prompt: &str) -> Result<Completion, OrchestratorError> {
        self.run_with_cancellation(prompt, &CancellationToken::new())
            .await
    }

    pub async fn run_with_cancellation(
        &self,
        prompt: &str,
        cancellation: &CancellationToken,
    ) -> Result<Completion, OrchestratorError> {
        let mut attempts: Vec<ModelAttempt> = Vec::with_capacity(self.models.len());
        let mut state = FallbackState::Trying(0);

        loop {
            state = match state {
                FallbackState::Trying(index) if index >= self.models.len() => {
                    FallbackState::Exhausted
                }
                FallbackState::Trying(index) => {
                    let model = &self.models[index];
                    let started = Instant::now();
                    let result = tokio::select! {
                        biased;
                        _ = cancellation.cancelled() => {
                            tracing::info!(
                                model = %model,
                                attempt = index + 1,
                                "diagnosis cancelled"
                            );
                            return Err(OrchestratorError::Cancelled { attempts });
                        }
                        result = tokio::time::timeout(
                            self.attempt_timeout,
                            self.client.invoke(model, prompt, &self.generation),
                        ) => result
                            .unwrap_or_else(|_| Err(ModelError::timed_out(self.attempt_timeout))),
                    };
                    let elapsed = started.elapsed();

                    match result {
                        Ok(text) => {
                            tracing::info!(
                                model = %model,
                                attempt = index + 1,
                                elapsed_ms = elapsed.as_millis() as u64,
                                "model attempt succeeded"
                            );
                            attempts.push(ModelAttempt {
                                model: model.clone(),
                                outcome: AttemptOutcome::Success(text.clone()),
                                elapsed,
                            });
                            FallbackState::Succeeded(text)
                        }
                        Err(error) => {
                            let retryable = error.is_retryable();
                            tracing::warn!(
                                model = %model,
                                attempt = index + 1,
                                elapsed_ms = elapsed.as_millis() as u64,
                                error = %error,
                                retryable,
                                "model attempt failed"
                            );
                            attempts.push(ModelAttempt {
                                model: model.clone(),
                                outcome: error.into(),
                                elapsed,
                            });
                            if retryable {
                                FallbackState::Trying(index + 1)
                            } else {
                                FallbackState::Exhausted
                            }
                        }
                    }
                }
                FallbackState::Succeeded(text) => {
                    let model = attempts
                        .last()
                        .map(|attempt| attempt.model.clone())
                        .unwrap_or_default();
                    return Ok(Completion {
                        model,
                        text,
                        attempts,
                    });
                }
                FallbackState::Exhausted => {
                    tracing::error!(attempts = attempts.len(), "all models exhausted");
                    return Err(OrchestratorError::Exhausted { attempts });
                }
            };
        }
    }
}
