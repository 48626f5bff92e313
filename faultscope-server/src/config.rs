//! Command-line and environment configuration for the server binary.

use std::sync::Arc;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::Parser;
use faultscope::{
    CannedModelClient, ClampPolicy, ConfigError, DiagnosisConfig, GeminiClient, GenerationConfig,
    ModelClient, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MODELS,
};
use secrecy::SecretString;

/// Every flag falls back to an environment variable, and a `.env` file is
/// read before parsing.
// No `Debug` derive: the struct holds the API key.
#[derive(Clone, Parser)]
#[command(name = "faultscope-server", version, about = "Machine-symptom diagnosis over HTTP")]
pub struct ServerArgs {
    #[arg(long, env = "FAULTSCOPE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Gemini API key. Required unless --test-mode is set.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model tried before the fallback list.
    #[arg(long, env = "GEMINI_MODEL")]
    pub model: Option<String>,

    /// Comma-separated fallback models, replacing the built-in list.
    #[arg(long, env = "GEMINI_FALLBACK_MODELS", value_delimiter = ',')]
    pub fallback_models: Option<Vec<String>>,

    #[arg(long, env = "GEMINI_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(
        long,
        env = "FAULTSCOPE_ATTEMPT_TIMEOUT_SECS",
        default_value_t = DEFAULT_ATTEMPT_TIMEOUT.as_secs()
    )]
    pub attempt_timeout_secs: u64,

    #[arg(long, env = "FAULTSCOPE_MAX_OUTPUT_TOKENS")]
    pub max_output_tokens: Option<u32>,

    /// Normalize out-of-range model output without logging or reporting it.
    #[arg(long, env = "FAULTSCOPE_SILENT_CLAMPS", value_parser = BoolishValueParser::new())]
    pub silent_clamps: bool,

    /// Answer every request with a canned diagnosis instead of calling Gemini.
    #[arg(long, env = "GEMINI_TEST_MODE", value_parser = BoolishValueParser::new())]
    pub test_mode: bool,
}

impl ServerArgs {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn diagnosis_config(&self) -> Result<DiagnosisConfig, ConfigError> {
        let mut builder = DiagnosisConfig::builder()
            .attempt_timeout(Duration::from_secs(self.attempt_timeout_secs))
            .clamp_policy(if self.silent_clamps {
                ClampPolicy::Silent
            } else {
                ClampPolicy::Warn
            });

        if let Some(max_output_tokens) = self.max_output_tokens {
            builder = builder.generation(GenerationConfig {
                max_output_tokens,
                ..GenerationConfig::default()
            });
        }

        // An explicit model goes in front of the whole default list.
        builder = match (&self.model, &self.fallback_models) {
            (Some(model), Some(fallbacks)) => builder
                .primary_model(model.clone())
                .fallback_models(fallbacks.iter().cloned()),
            (Some(model), None) => builder
                .primary_model(model.clone())
                .fallback_models(DEFAULT_MODELS.iter().copied()),
            (None, Some(fallbacks)) => builder.fallback_models(fallbacks.iter().cloned()),
            (None, None) => builder,
        };

        builder.build()
    }

    pub fn model_client(&self) -> Result<Arc<dyn ModelClient>, ConfigError> {
        if self.test_mode {
            tracing::warn!("test mode enabled, serving canned diagnoses");
            return Ok(Arc::new(CannedModelClient::new()));
        }

        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid(
                    "GEMINI_API_KEY is required unless test mode is enabled".to_string(),
                )
            })?;

        let mut client = GeminiClient::new(SecretString::new(api_key.to_string()));
        if let Some(base_url) = &self.base_url {
            client = client.with_base_url(base_url.clone());
        }
        Ok(Arc::new(client))
    }
}
