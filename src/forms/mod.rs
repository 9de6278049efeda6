//! Form definitions: the static catalog of surveys and registration forms.
//!
//! This module provides:
//! - `FormDefinition` / `QuestionDefinition`: typed form structure
//! - `Answer` / `AnswerSet`: answers constrained by question type
//! - `FormCatalog`: read-only lookup of forms by kind and id
//! - Built-in forms used when no catalog files are configured

mod builtins;
mod catalog;
mod types;

pub use builtins::*;
pub use catalog::{FormCatalog, FormKind};
pub use types::*;
