use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Low temperature keeps technical output reproducible across requests.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    Text,
    /// Ask the provider for JSON-constrained output. Treated as a hint only;
    /// the response is still validated.
    #[default]
    Json,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub response_format: ResponseFormat,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            response_format: ResponseFormat::Json,
        }
    }
}

/// One round-trip to an upstream generative model.
///
/// Implementations must map every failure onto [`ModelError`] so the
/// fallback orchestrator can decide whether to try the next model.
#[async_trait::async_trait]
pub trait ModelClient: Send + Sync + 'static {
    async fn invoke(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ModelError>;
}
