use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::error::{FormError, FormResult};
use crate::forms::FormDefinition;

/// Display labels for answer keys. Unmapped keys display verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldLabels(HashMap<String, String>);

impl FieldLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels taken from the question texts of the given forms. When two
    /// forms share a question id the first one wins.
    pub fn from_forms(forms: &[FormDefinition]) -> Self {
        let mut labels = HashMap::new();
        for question in forms.iter().flat_map(|f| f.questions.iter()) {
            labels
                .entry(question.id.clone())
                .or_insert_with(|| question.text.clone());
        }
        Self(labels)
    }

    /// Parse a JSON object of `{"field_id": "Label"}`.
    pub fn from_json(json: &str) -> FormResult<Self> {
        let labels: HashMap<String, String> =
            serde_json::from_str(json).map_err(|e| FormError::Catalog {
                message: format!("invalid field labels: {}", e),
            })?;
        Ok(Self(labels))
    }

    /// Read labels from a JSON file.
    pub fn load(path: &Path) -> FormResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| FormError::Catalog {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let labels = Self::from_json(&json)?;
        debug!(path = %path.display(), labels = labels.len(), "Field labels loaded");
        Ok(labels)
    }

    /// Overlay `overrides` on top of these labels.
    pub fn with_overrides(mut self, overrides: FieldLabels) -> Self {
        self.0.extend(overrides.0);
        self
    }

    pub fn insert(&mut self, field_id: impl Into<String>, label: impl Into<String>) {
        self.0.insert(field_id.into(), label.into());
    }

    /// Label for a field id, or the id itself.
    pub fn label<'a>(&'a self, field_id: &'a str) -> &'a str {
        self.0.get(field_id).map(String::as_str).unwrap_or(field_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
