//! Storage layer for submitted survey responses and registrations.
//!
//! This module provides SQLite-based storage for two independent record
//! collections, each with a secondary index on the form it belongs to:
//! - `responses`: survey answers, indexed by `survey_id`
//! - `registrations`: registration submissions, indexed by `registration_id`
//!
//! The schema is versioned (see [`migrations`]) and records are written one
//! per transaction.

mod handle;
pub mod migrations;
mod sqlite;

pub use handle::StoreHandle;
pub use migrations::LATEST_SCHEMA_VERSION;
pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;
use crate::forms::AnswerSet;

/// One of the two durable record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Responses,
    Registrations,
}

impl Collection {
    /// Table backing this collection.
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Responses => "responses",
            Collection::Registrations => "registrations",
        }
    }

    /// Column carrying the foreign key into the form catalog.
    pub fn index_column(&self) -> &'static str {
        match self {
            Collection::Responses => "survey_id",
            Collection::Registrations => "registration_id",
        }
    }

    /// Schema version that introduced this collection.
    pub fn since_version(&self) -> i64 {
        match self {
            Collection::Responses => 1,
            Collection::Registrations => 2,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.table())
    }
}

/// A stored survey response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedResponse {
    /// Unique response identifier.
    pub id: String,
    /// Survey this response answers. Not checked against the catalog.
    pub survey_id: String,
    /// Answers keyed by question id.
    pub answers: AnswerSet,
    /// Assigned by the store at write time.
    pub submitted_at: DateTime<Utc>,
    /// False for partial saves.
    pub completed: bool,
}

/// A survey response about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewResponse {
    /// Explicit id; the store generates one when absent.
    pub id: Option<String>,
    pub survey_id: String,
    pub answers: AnswerSet,
    pub completed: bool,
}

impl NewResponse {
    /// A completed response with a store-generated id.
    pub fn new(survey_id: impl Into<String>, answers: AnswerSet) -> Self {
        Self {
            id: None,
            survey_id: survey_id.into(),
            answers,
            completed: true,
        }
    }

    /// Use an explicit id, overwriting any record that already has it.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Mark the response as a partial save.
    pub fn partial(mut self) -> Self {
        self.completed = false;
        self
    }
}

/// A stored registration submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSubmission {
    /// Unique submission identifier.
    pub id: String,
    /// Registration form this submission belongs to.
    pub registration_id: String,
    /// Field values keyed by field id.
    pub responses: AnswerSet,
    /// Assigned by the store at write time.
    pub completed_at: DateTime<Utc>,
}

/// A registration submission about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRegistration {
    /// Explicit id; the store generates one when absent.
    pub id: Option<String>,
    pub registration_id: String,
    pub responses: AnswerSet,
}

impl NewRegistration {
    /// Create a new registration for the given form.
    pub fn new(registration_id: impl Into<String>, responses: AnswerSet) -> Self {
        Self {
            id: None,
            registration_id: registration_id.into(),
            responses,
        }
    }

    /// Use an explicit id, overwriting any record that already has it.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Storage backend trait.
///
/// Every `put_*` is a single-record transaction that returns the fully
/// materialized record, including store-assigned fields.
#[async_trait]
pub trait Storage: Send + Sync {
    // Responses

    /// Insert or overwrite a survey response.
    async fn put_response(&self, response: NewResponse) -> StorageResult<SubmittedResponse>;
    /// All survey responses in insertion order.
    async fn get_all_responses(&self) -> StorageResult<Vec<SubmittedResponse>>;
    /// Survey responses for one survey, via the `survey_id` index.
    async fn get_responses_by_survey(&self, survey_id: &str)
        -> StorageResult<Vec<SubmittedResponse>>;

    // Registrations

    /// Insert or overwrite a registration submission.
    async fn put_registration(
        &self,
        registration: NewRegistration,
    ) -> StorageResult<RegistrationSubmission>;
    /// All registration submissions in insertion order.
    async fn get_all_registrations(&self) -> StorageResult<Vec<RegistrationSubmission>>;
    /// Registration submissions for one form, via the `registration_id` index.
    async fn get_registrations_by_form(
        &self,
        registration_id: &str,
    ) -> StorageResult<Vec<RegistrationSubmission>>;

    /// Number of records in `collection` whose foreign key equals `key`.
    async fn count_by_index(&self, collection: Collection, key: &str) -> StorageResult<u64>;
}
