mod canned;

// Provider-specific clients
pub mod providers;

pub use canned::{CannedModelClient, CANNED_DIAGNOSIS};
pub use faultscope_core::{GenerationConfig, ModelClient, ModelError, ResponseFormat};
pub use providers::google::GeminiClient;
