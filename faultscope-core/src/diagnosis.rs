use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const DEFAULT_EQUIPMENT_NAME: &str = "Not specified";

/// A technician's free-text description of a misbehaving machine.
///
/// Built once per request and never mutated afterwards; the `with_*` methods
/// consume the report and return a new one.
#[derive(Clone, Debug, PartialEq)]
pub struct SymptomReport {
    symptoms: String,
    equipment_name: Option<String>,
    machine_id: Option<String>,
    metadata: BTreeMap<String, Value>,
    request_token: String,
}

impl SymptomReport {
    pub fn new(symptoms: impl Into<String>) -> Self {
        Self {
            symptoms: symptoms.into(),
            equipment_name: None,
            machine_id: None,
            metadata: BTreeMap::new(),
            request_token: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_equipment_name(mut self, value: impl Into<String>) -> Self {
        self.equipment_name = non_blank(value.into());
        self
    }

    pub fn with_machine_id(mut self, value: impl Into<String>) -> Self {
        self.machine_id = non_blank(value.into());
        self
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Replaces the generated request token. Mostly useful to make prompts
    /// reproducible in tests.
    pub fn with_request_token(mut self, token: impl Into<String>) -> Self {
        self.request_token = token.into();
        self
    }

    pub fn symptoms(&self) -> &str {
        &self.symptoms
    }

    pub fn equipment_name(&self) -> &str {
        self.equipment_name
            .as_deref()
            .unwrap_or(DEFAULT_EQUIPMENT_NAME)
    }

    pub fn machine_id(&self) -> Option<&str> {
        self.machine_id.as_deref()
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    pub fn request_token(&self) -> &str {
        &self.request_token
    }

    pub fn has_symptoms(&self) -> bool {
        !self.symptoms.trim().is_empty()
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Case-insensitive lookup, surrounding whitespace ignored.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|severity| severity.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Mechanical,
    Electrical,
    Software,
    Sensor,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Mechanical,
        Category::Electrical,
        Category::Software,
        Category::Sensor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Mechanical => "mechanical",
            Category::Electrical => "electrical",
            Category::Software => "software",
            Category::Sensor => "sensor",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProbableCause {
    pub cause: String,
    /// Percentage, always within `0..=100` after validation.
    pub likelihood: u8,
}

/// The validated result of analysing a [`SymptomReport`].
///
/// The first five fields form the required contract. The rest are optional
/// extras the model is asked for; they are omitted from JSON when absent.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Diagnosis {
    pub summary: String,
    pub severity: Severity,
    pub confidence: f64,
    pub probable_causes: Vec<ProbableCause>,
    pub recommended_actions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub troubleshooting_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub estimated_parts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommended_tests: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs_needed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_priority: Option<u8>,
}

/// A normalization the validator applied to the model's output.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Adjustment {
    pub field: String,
    #[serde(flatten)]
    pub kind: AdjustmentKind,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdjustmentKind {
    Clamped { original: f64, value: f64 },
    Dropped { reason: String },
}

impl Adjustment {
    pub fn clamped(field: impl Into<String>, original: f64, value: f64) -> Self {
        Self {
            field: field.into(),
            kind: AdjustmentKind::Clamped { original, value },
        }
    }

    pub fn dropped(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: AdjustmentKind::Dropped {
                reason: reason.into(),
            },
        }
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AdjustmentKind::Clamped { original, value } => {
                write!(f, "{} clamped from {original} to {value}", self.field)
            }
            AdjustmentKind::Dropped { reason } => write!(f, "{} dropped: {reason}", self.field),
        }
    }
}
