//! Parse-then-validate boundary between untyped model text and [`Diagnosis`].
//!
//! Provider-side "JSON mode" is only a hint, so the payload is first dug out
//! of whatever prose or code fences surround it and then checked field by
//! field. Out-of-range numbers are clamped and reported as [`Adjustment`]s
//! instead of failing the whole diagnosis.

use serde_json::{Map, Value};

use crate::{Adjustment, Category, Diagnosis, ProbableCause, Severity, ValidationError};

const REQUIRED_FIELDS: [(&str, &str); 5] = [
    ("summary", "summary"),
    ("severity", "severity"),
    ("confidence", "confidence"),
    ("probable_causes", "probableCauses"),
    ("recommended_actions", "recommendedActions"),
];

#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedDiagnosis {
    pub diagnosis: Diagnosis,
    /// The model's text exactly as received, kept for audit.
    pub raw_output: String,
    pub adjustments: Vec<Adjustment>,
}

pub fn parse(raw_text: &str) -> Result<ValidatedDiagnosis, ValidationError> {
    let payload = extract_payload(raw_text)?;
    let mut adjustments = Vec::new();
    let diagnosis = validate(&payload, &mut adjustments)?;
    Ok(ValidatedDiagnosis {
        diagnosis,
        raw_output: raw_text.to_string(),
        adjustments,
    })
}

/// Finds the JSON object inside `raw_text`.
///
/// Candidates, in order: the whole text, the body of the first code fence,
/// and the span from the first `{` to the last `}`.
pub fn extract_payload(raw_text: &str) -> Result<Map<String, Value>, ValidationError> {
    let trimmed = raw_text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::malformed("model returned no text"));
    }

    let candidates = [Some(trimmed), fenced_body(trimmed), brace_span(trimmed)];
    let mut saw_non_object = false;
    for candidate in candidates.into_iter().flatten() {
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(object)) => return Ok(object),
            Ok(_) => saw_non_object = true,
            Err(_) => {}
        }
    }

    if saw_non_object {
        Err(ValidationError::malformed("expected a JSON object"))
    } else {
        Err(ValidationError::malformed(
            "no JSON object found in model output",
        ))
    }
}

fn fenced_body(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = text[start + 3..].trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let end = after.find("```")?;
    Some(after[..end].trim())
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn lookup<'a>(object: &'a Map<String, Value>, name: &str, alias: &str) -> Option<&'a Value> {
    object
        .get(name)
        .or_else(|| object.get(alias))
        .filter(|value| !value.is_null())
}

fn required<'a>(
    object: &'a Map<String, Value>,
    name: &str,
    alias: &str,
) -> Result<&'a Value, ValidationError> {
    lookup(object, name, alias).ok_or_else(|| ValidationError::IncompleteOutput {
        missing: vec![name.to_string()],
    })
}

fn missing_fields(object: &Map<String, Value>) -> Vec<String> {
    let mut missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|(name, alias)| lookup(object, name, alias).is_none())
        .map(|(name, _)| name.to_string())
        .collect();

    if let Some(Value::Array(causes)) = lookup(object, "probable_causes", "probableCauses") {
        for (index, entry) in causes.iter().enumerate() {
            let Value::Object(entry) = entry else {
                continue;
            };
            for key in ["cause", "likelihood"] {
                if entry.get(key).map_or(true, Value::is_null) {
                    missing.push(format!("probable_causes[{index}].{key}"));
                }
            }
        }
    }

    missing
}

fn validate(
    object: &Map<String, Value>,
    adjustments: &mut Vec<Adjustment>,
) -> Result<Diagnosis, ValidationError> {
    let missing = missing_fields(object);
    if !missing.is_empty() {
        return Err(ValidationError::IncompleteOutput { missing });
    }

    let summary = expect_string(required(object, "summary", "summary")?, "summary")?;
    let severity = severity(required(object, "severity", "severity")?)?;

    let raw_confidence =
        expect_number(required(object, "confidence", "confidence")?, "confidence")?;
    let confidence = clamp("confidence", raw_confidence, 0.0, 1.0, adjustments);

    let probable_causes = probable_causes(
        required(object, "probable_causes", "probableCauses")?,
        adjustments,
    )?;
    let recommended_actions = expect_string_list(
        required(object, "recommended_actions", "recommendedActions")?,
        "recommended_actions",
    )?;

    Ok(Diagnosis {
        summary,
        severity,
        confidence,
        probable_causes,
        recommended_actions,
        troubleshooting_steps: optional_list(
            object,
            ("troubleshooting_steps", "troubleshootingSteps"),
            adjustments,
        ),
        estimated_parts: optional_list(object, ("estimated_parts", "estimatedParts"), adjustments),
        estimated_time_hours: estimated_time_hours(object, adjustments),
        required_tools: optional_list(object, ("required_tools", "requiredTools"), adjustments),
        recommended_tests: optional_list(
            object,
            ("recommended_tests", "recommendedTests"),
            adjustments,
        ),
        logs_needed: optional_list(object, ("logs_needed", "logsNeeded"), adjustments),
        component: component(object, adjustments),
        category: category(object, adjustments),
        maintenance_priority: maintenance_priority(object, adjustments),
    })
}

fn expect_string(value: &Value, field: &str) -> Result<String, ValidationError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ValidationError::malformed(format!("field '{field}' must be a string")))
}

fn expect_number(value: &Value, field: &str) -> Result<f64, ValidationError> {
    value
        .as_f64()
        .ok_or_else(|| ValidationError::malformed(format!("field '{field}' must be a number")))
}

fn expect_string_list(value: &Value, field: &str) -> Result<Vec<String>, ValidationError> {
    string_list(value).ok_or_else(|| {
        ValidationError::malformed(format!("field '{field}' must be a list of strings"))
    })
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

fn severity(value: &Value) -> Result<Severity, ValidationError> {
    let label = match value {
        Value::String(label) => label.clone(),
        other => other.to_string(),
    };
    Severity::from_label(&label).ok_or_else(|| ValidationError::InvalidEnum {
        field: "severity".to_string(),
        value: label,
        allowed: Severity::ALL
            .iter()
            .map(|severity| severity.as_str().to_string())
            .collect(),
    })
}

fn clamp(field: &str, value: f64, min: f64, max: f64, adjustments: &mut Vec<Adjustment>) -> f64 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        adjustments.push(Adjustment::clamped(field, value, clamped));
    }
    clamped
}

fn probable_causes(
    value: &Value,
    adjustments: &mut Vec<Adjustment>,
) -> Result<Vec<ProbableCause>, ValidationError> {
    let entries = value.as_array().ok_or_else(|| {
        ValidationError::malformed("field 'probable_causes' must be a list of objects")
    })?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| -> Result<ProbableCause, ValidationError> {
            let field = format!("probable_causes[{index}]");
            let entry = entry.as_object().ok_or_else(|| {
                ValidationError::malformed(format!("field '{field}' must be an object"))
            })?;
            let cause = expect_string(
                required(entry, "cause", "cause")?,
                &format!("{field}.cause"),
            )?;
            let likelihood_field = format!("{field}.likelihood");
            let likelihood = expect_number(
                required(entry, "likelihood", "likelihood")?,
                &likelihood_field,
            )?;
            let likelihood = clamp(&likelihood_field, likelihood.round(), 0.0, 100.0, adjustments);
            Ok(ProbableCause {
                cause,
                likelihood: likelihood as u8,
            })
        })
        .collect()
}

fn optional_list(
    object: &Map<String, Value>,
    (name, alias): (&str, &str),
    adjustments: &mut Vec<Adjustment>,
) -> Vec<String> {
    let Some(value) = lookup(object, name, alias) else {
        return Vec::new();
    };
    string_list(value).unwrap_or_else(|| {
        adjustments.push(Adjustment::dropped(name, "expected a list of strings"));
        Vec::new()
    })
}

fn estimated_time_hours(
    object: &Map<String, Value>,
    adjustments: &mut Vec<Adjustment>,
) -> Option<f64> {
    const FIELD: &str = "estimated_time_hours";
    let value = lookup(object, FIELD, "estimatedTimeHours")?;
    match value.as_f64() {
        Some(hours) => Some(clamp(FIELD, hours, 0.0, f64::MAX, adjustments)),
        None => {
            adjustments.push(Adjustment::dropped(FIELD, "expected a number"));
            None
        }
    }
}

fn component(object: &Map<String, Value>, adjustments: &mut Vec<Adjustment>) -> Option<String> {
    let value = lookup(object, "component", "component")?;
    match value.as_str().map(str::trim) {
        Some("") => None,
        Some(component) => Some(component.to_string()),
        None => {
            adjustments.push(Adjustment::dropped("component", "expected a string"));
            None
        }
    }
}

fn category(object: &Map<String, Value>, adjustments: &mut Vec<Adjustment>) -> Option<Category> {
    let value = lookup(object, "category", "category")?;
    let category = value.as_str().and_then(Category::from_label);
    if category.is_none() {
        adjustments.push(Adjustment::dropped(
            "category",
            format!("unknown category {value}"),
        ));
    }
    category
}

fn maintenance_priority(
    object: &Map<String, Value>,
    adjustments: &mut Vec<Adjustment>,
) -> Option<u8> {
    const FIELD: &str = "maintenance_priority";
    let value = lookup(object, FIELD, "maintenancePriority")?;
    match value.as_f64() {
        Some(priority) => Some(clamp(FIELD, priority.round(), 1.0, 5.0, adjustments) as u8),
        None => {
            adjustments.push(Adjustment::dropped(FIELD, "expected a number"));
            None
        }
    }
}
