use std::collections::HashMap;

use faultscope_core::ConfigError;
use regex::Regex;

/// A text template with `{{name}}` placeholders.
///
/// Substituted values are inserted verbatim and never scanned for further
/// placeholders, so user text containing `{{...}}` stays inert.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    pattern: Regex,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, ConfigError> {
        let pattern = Regex::new(r"\{\{\s*(\w+)\s*\}\}")
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(Self {
            template: template.into(),
            pattern,
        })
    }

    /// Placeholder names in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for caps in self.pattern.captures_iter(&self.template) {
            if let Some(name) = caps.get(1).map(|m| m.as_str()) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Unknown placeholders render as the empty string.
    pub fn render(&self, vars: &HashMap<&str, String>) -> String {
        self.pattern
            .replace_all(&self.template, |caps: &regex::Captures| {
                vars.get(&caps[1]).cloned().unwrap_or_default()
            })
            .into_owned()
    }
}
