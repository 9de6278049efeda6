//! Read-only catalog of survey and registration forms.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::builtins;
use super::types::FormDefinition;
use crate::config::CatalogConfig;
use crate::error::{FormError, FormResult};

/// Which catalog a form belongs to, and so which collection its
/// submissions are stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    Survey,
    Registration,
}

impl FormKind {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormKind::Survey => "survey",
            FormKind::Registration => "registration",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            FormKind::Survey => "Survey",
            FormKind::Registration => "Registration",
        }
    }
}

impl std::fmt::Display for FormKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The two form catalogs, loaded once and never mutated.
#[derive(Debug, Clone)]
pub struct FormCatalog {
    surveys: Vec<FormDefinition>,
    registrations: Vec<FormDefinition>,
}

impl FormCatalog {
    /// Build a catalog, validating every form and id uniqueness per catalog.
    pub fn new(
        surveys: Vec<FormDefinition>,
        registrations: Vec<FormDefinition>,
    ) -> FormResult<Self> {
        validate_catalog(&surveys)?;
        validate_catalog(&registrations)?;
        Ok(Self {
            surveys,
            registrations,
        })
    }

    /// Catalog of built-in forms.
    pub fn builtin() -> Self {
        Self {
            surveys: builtins::builtin_surveys(),
            registrations: builtins::builtin_registrations(),
        }
    }

    /// Parse catalogs from JSON arrays of form definitions.
    pub fn from_json(surveys: &str, registrations: &str) -> FormResult<Self> {
        Self::new(parse_forms(surveys)?, parse_forms(registrations)?)
    }

    /// Load catalogs from the configured files, falling back to the
    /// built-in forms for any catalog without a file.
    pub fn load(config: &CatalogConfig) -> FormResult<Self> {
        let surveys = match &config.surveys_path {
            Some(path) => read_forms(path)?,
            None => builtins::builtin_surveys(),
        };
        let registrations = match &config.registrations_path {
            Some(path) => read_forms(path)?,
            None => builtins::builtin_registrations(),
        };

        let catalog = Self::new(surveys, registrations)?;
        info!(
            surveys = catalog.surveys.len(),
            registrations = catalog.registrations.len(),
            "Form catalog loaded"
        );
        Ok(catalog)
    }

    /// All forms of one kind, in catalog order.
    pub fn forms(&self, kind: FormKind) -> &[FormDefinition] {
        match kind {
            FormKind::Survey => &self.surveys,
            FormKind::Registration => &self.registrations,
        }
    }

    /// Survey definitions.
    pub fn surveys(&self) -> &[FormDefinition] {
        &self.surveys
    }

    /// Registration definitions.
    pub fn registrations(&self) -> &[FormDefinition] {
        &self.registrations
    }

    /// Find a form by id.
    pub fn find(&self, kind: FormKind, id: &str) -> Option<&FormDefinition> {
        self.forms(kind).iter().find(|f| f.id == id)
    }

    /// Find a form by id, failing with `NotFound`.
    pub fn get(&self, kind: FormKind, id: &str) -> FormResult<&FormDefinition> {
        self.find(kind, id).ok_or_else(|| FormError::NotFound {
            kind: kind.label().to_string(),
            form_id: id.to_string(),
        })
    }
}

impl Default for FormCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn parse_forms(json: &str) -> FormResult<Vec<FormDefinition>> {
    serde_json::from_str(json).map_err(|e| FormError::Catalog {
        message: e.to_string(),
    })
}

fn read_forms(path: &Path) -> FormResult<Vec<FormDefinition>> {
    debug!(path = %path.display(), "Reading form catalog");
    let raw = std::fs::read_to_string(path).map_err(|e| FormError::Catalog {
        message: format!("{}: {}", path.display(), e),
    })?;
    parse_forms(&raw)
}

fn validate_catalog(forms: &[FormDefinition]) -> FormResult<()> {
    let mut seen = HashSet::new();
    for form in forms {
        form.validate()?;
        if !seen.insert(form.id.as_str()) {
            return Err(FormError::InvalidDefinition {
                form_id: form.id.clone(),
                reason: "duplicate form id in catalog".to_string(),
            });
        }
    }
    Ok(())
}
