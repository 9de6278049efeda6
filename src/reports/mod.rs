//! Aggregation and reporting over stored records.
//!
//! Everything here is a pure function of stored records and the form
//! catalog. Records whose foreign key matches no catalog form are never an
//! error; they are counted as unmatched and shown under a fallback title.

mod counts;
mod labels;
mod rows;

pub use counts::{chart_series, count_by_form, ChartPoint, FormCount, FormCounts};
pub use labels::FieldLabels;
pub use rows::{
    registration_summary, sort_rows, to_detail_rows, to_report_rows, RecordStatus,
    RegistrationSummary, ReportColumn, ReportRow, SortKey, UNKNOWN_TITLE,
};

use chrono::{DateTime, Utc};

use crate::forms::AnswerSet;
use crate::storage::{RegistrationSubmission, SubmittedResponse};

/// Common view over both stored record types.
pub trait FormRecord {
    /// Record id.
    fn record_id(&self) -> &str;
    /// Foreign key into the form catalog.
    fn form_id(&self) -> &str;
    /// Store-assigned timestamp.
    fn recorded_at(&self) -> DateTime<Utc>;
    /// Stored answers keyed by question id.
    fn answers(&self) -> &AnswerSet;
    /// False for partial saves.
    fn is_complete(&self) -> bool {
        true
    }
}

impl FormRecord for SubmittedResponse {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn form_id(&self) -> &str {
        &self.survey_id
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    fn is_complete(&self) -> bool {
        self.completed
    }
}

impl FormRecord for RegistrationSubmission {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn form_id(&self) -> &str {
        &self.registration_id
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    fn answers(&self) -> &AnswerSet {
        &self.responses
    }
}
