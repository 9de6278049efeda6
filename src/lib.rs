//! # Survey Collector
//!
//! Offline survey and registration data collection: multi-step forms,
//! durable local storage of submissions, and analytics/reports over what
//! was collected.
//!
//! ## Features
//!
//! - **Form Catalog**: built-in or JSON-supplied surveys and registration forms
//! - **Traversal**: question-by-question navigation with validated, typed answers
//! - **Versioned Storage**: SQLite collections for responses and registrations,
//!   each indexed by the form it belongs to, with additive migrations
//! - **Reports**: per-form counts, chart input and labelled report rows
//!
//! ## Architecture
//!
//! ```text
//! Form Catalog → Traversal (FormSession) → Storage (SQLite)
//!                                               ↓
//!                                     Reports → CLI shell
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use survey_collector::forms::{Answer, FormCatalog, FormKind};
//! use survey_collector::storage::SqliteStorage;
//! use survey_collector::traversal::{FormSession, Step};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStorage::new_in_memory().await?;
//!     let catalog = FormCatalog::builtin();
//!     let session = FormSession::start(&catalog, FormKind::Survey, "session-feedback", store)?;
//!     session.answer(Answer::Number(9))?;
//!     while let Step::Question(_) = session.next().await? {}
//!     Ok(())
//! }
//! ```

/// Command-line shell.
pub mod cli;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Form definitions, answers and the form catalog.
pub mod forms;
/// Counts, chart input and report rows over stored records.
pub mod reports;
/// SQLite storage layer for persistence.
pub mod storage;
/// Form traversal state machine and store-backed sessions.
pub mod traversal;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use forms::{FormCatalog, FormKind};
pub use storage::{SqliteStorage, Storage, StoreHandle};
pub use traversal::FormSession;
