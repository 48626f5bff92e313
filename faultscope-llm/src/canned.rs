use faultscope_core::{GenerationConfig, ModelClient, ModelError};

/// Well-formed diagnosis returned by [`CannedModelClient`].
pub const CANNED_DIAGNOSIS: &str = r#"{"summary":"Excessive shaft vibration and rising motor temperature","probable_causes":[{"cause":"Rotor imbalance","likelihood":70},{"cause":"Worn bearing","likelihood":60}],"severity":"high","recommended_actions":["Stop the machine and inspect the bearings","Check shaft alignment","Replace damaged parts"],"troubleshooting_steps":["Measure vibration with a vibrometer","Visually inspect the rotor","Check motor current and voltage"],"estimated_parts":["Bearing - P/N 1234","Gasket - P/N 5678"],"estimated_time_hours":3.5,"confidence":0.85,"required_tools":["Torque wrench","Vibrometer","Infrared thermometer"],"recommended_tests":["Vibration test (ISO 10816)","Temperature reading at 3 points"],"logs_needed":["Last 24h of motor current","Maintenance logs for the last 6 months"],"component":"motor","category":"mechanical","maintenance_priority":2}"#;

/// Offline stand-in for a real provider: answers every model with the same
/// fixed text and never touches the network.
#[derive(Clone, Debug)]
pub struct CannedModelClient {
    response: String,
}

impl CannedModelClient {
    pub fn new() -> Self {
        Self::with_response(CANNED_DIAGNOSIS)
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl Default for CannedModelClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ModelClient for CannedModelClient {
    async fn invoke(
        &self,
        model: &str,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<String, ModelError> {
        tracing::debug!(model = %model, "returning canned diagnosis");
        Ok(self.response.clone())
    }
}
