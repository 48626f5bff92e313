use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, GenerationConfig};

/// Primary model first, then the revisions tried when it is throttled,
/// failing, or no longer served.
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.0-flash-lite",
];

/// Upper bound for one model call. A full walk of [`DEFAULT_MODELS`] that
/// hangs on every model still answers within 40 s.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// How out-of-range numbers in model output are reported once clamped.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClampPolicy {
    /// Log every adjustment and hand it back to the caller.
    #[default]
    Warn,
    /// Normalize quietly.
    Silent,
}

/// Immutable, process-wide settings for the diagnosis pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct DiagnosisConfig {
    models: Vec<String>,
    generation: GenerationConfig,
    attempt_timeout: Duration,
    clamp_policy: ClampPolicy,
}

impl DiagnosisConfig {
    pub fn builder() -> DiagnosisConfigBuilder {
        DiagnosisConfigBuilder::default()
    }

    /// Ordered, de-duplicated model identifiers.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    pub fn clamp_policy(&self) -> ClampPolicy {
        self.clamp_policy
    }
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|model| model.to_string()).collect(),
            generation: GenerationConfig::default(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            clamp_policy: ClampPolicy::default(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DiagnosisConfigBuilder {
    primary: Option<String>,
    fallbacks: Option<Vec<String>>,
    generation: Option<GenerationConfig>,
    attempt_timeout: Option<Duration>,
    clamp_policy: Option<ClampPolicy>,
}

impl DiagnosisConfigBuilder {
    /// Model tried first. Defaults to the head of [`DEFAULT_MODELS`].
    pub fn primary_model(mut self, model: impl Into<String>) -> Self {
        self.primary = Some(model.into());
        self
    }

    /// Replaces the default fallback revisions.
    pub fn fallback_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallbacks = Some(models.into_iter().map(Into::into).collect());
        self
    }

    pub fn generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    pub fn clamp_policy(mut self, policy: ClampPolicy) -> Self {
        self.clamp_policy = Some(policy);
        self
    }

    pub fn build(self) -> Result<DiagnosisConfig, ConfigError> {
        let primary = match self.primary {
            Some(model) => model,
            None => DEFAULT_MODELS[0].to_string(),
        };
        let fallbacks = match self.fallbacks {
            Some(models) => models,
            None => DEFAULT_MODELS[1..]
                .iter()
                .map(|model| model.to_string())
                .collect(),
        };

        let mut models: Vec<String> = Vec::with_capacity(fallbacks.len() + 1);
        for model in std::iter::once(primary).chain(fallbacks) {
            let model = model.trim();
            if model.is_empty() {
                return Err(ConfigError::BlankModel);
            }
            if !models.iter().any(|existing| existing == model) {
                models.push(model.to_string());
            }
        }

        let generation = self.generation.unwrap_or_default();
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(ConfigError::Temperature(generation.temperature.to_string()));
        }
        if generation.max_output_tokens == 0 {
            return Err(ConfigError::MaxOutputTokens);
        }

        let attempt_timeout = self.attempt_timeout.unwrap_or(DEFAULT_ATTEMPT_TIMEOUT);
        if attempt_timeout.is_zero() {
            return Err(ConfigError::AttemptTimeout);
        }

        Ok(DiagnosisConfig {
            models,
            generation,
            attempt_timeout,
            clamp_policy: self.clamp_policy.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_builder_matches_default_config() {
        let built = DiagnosisConfig::builder().build().unwrap();
        assert_eq!(built, DiagnosisConfig::default());
        assert_eq!(built.generation().temperature, 0.2);
    }

    #[test]
    fn primary_override_is_tried_first_and_not_repeated() {
        let config = DiagnosisConfig::builder()
            .primary_model("gemini-2.5-flash-lite")
            .build()
            .unwrap();
        assert_eq!(
            config.models(),
            &[
                "gemini-2.5-flash-lite".to_string(),
                "gemini-2.0-flash".to_string(),
                "gemini-2.0-flash-lite".to_string(),
            ]
        );
    }

    #[test]
    fn blank_model_is_rejected() {
        let err = DiagnosisConfig::builder()
            .fallback_models(["a", " "])
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::BlankModel);
    }

    #[test]
    fn default_walk_that_hangs_everywhere_ends_within_a_minute() {
        let config = DiagnosisConfig::default();
        let worst_case = config.attempt_timeout() * config.models().len() as u32;
        assert!(worst_case <= Duration::from_secs(60));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = DiagnosisConfig::builder()
            .attempt_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::AttemptTimeout);
    }
}
