use std::cmp::Ordering;
use std::collections::HashSet;
use std::convert::Infallible;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{FieldLabels, FormRecord};
use crate::forms::{Answer, FormDefinition};
use crate::storage::RegistrationSubmission;

/// Title shown for records whose form is not in the catalog.
pub const UNKNOWN_TITLE: &str = "Unknown";

const NOT_PROVIDED: &str = "Not provided";

/// Completion status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RecordStatus {
    Completed,
    Partial,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Completed => "Completed",
            RecordStatus::Partial => "Partial",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A labelled answer value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportColumn {
    pub label: String,
    pub value: String,
}

/// One displayable row per stored record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub form_id: String,
    /// Form title, or [`UNKNOWN_TITLE`].
    pub title: String,
    pub record_id: String,
    pub recorded_at: DateTime<Utc>,
    pub status: RecordStatus,
    /// 1-based position of the record in the input.
    pub ordinal: usize,
    /// "User #n".
    pub respondent: String,
    pub columns: Vec<ReportColumn>,
}

impl ReportRow {
    /// Value of the column with this label.
    pub fn column(&self, label: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.value.as_str())
    }
}

/// Build report rows in record order.
///
/// Columns follow the form's question order when the form is known; answers
/// to questions the form does not have come after, in key order. Only
/// scalar answers become columns.
pub fn to_report_rows<R: FormRecord>(
    records: &[R],
    definitions: &[FormDefinition],
    labels: &FieldLabels,
) -> Vec<ReportRow> {
    build_rows(records, definitions, labels, Answer::as_scalar)
}

/// Like [`to_report_rows`], but every answer becomes a column. Multi-select
/// answers are joined with ", ".
pub fn to_detail_rows<R: FormRecord>(
    records: &[R],
    definitions: &[FormDefinition],
    labels: &FieldLabels,
) -> Vec<ReportRow> {
    build_rows(records, definitions, labels, |answer| Some(answer.to_string()))
}

fn build_rows<R: FormRecord>(
    records: &[R],
    definitions: &[FormDefinition],
    labels: &FieldLabels,
    project: impl Fn(&Answer) -> Option<String>,
) -> Vec<ReportRow> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let form = definitions.iter().find(|d| d.id == record.form_id());
            let answers = record.answers();

            let mut columns = Vec::with_capacity(answers.len());
            let mut seen = HashSet::new();
            if let Some(form) = form {
                for question in &form.questions {
                    seen.insert(question.id.as_str());
                    if let Some(value) = answers.get(&question.id).and_then(&project) {
                        columns.push(ReportColumn {
                            label: labels.label(&question.id).to_string(),
                            value,
                        });
                    }
                }
            }
            for (key, answer) in answers.iter() {
                if seen.contains(key) {
                    continue;
                }
                if let Some(value) = project(answer) {
                    columns.push(ReportColumn {
                        label: labels.label(key).to_string(),
                        value,
                    });
                }
            }

            ReportRow {
                form_id: record.form_id().to_string(),
                title: form
                    .map(|f| f.title.clone())
                    .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
                record_id: record.record_id().to_string(),
                recorded_at: record.recorded_at(),
                status: if record.is_complete() {
                    RecordStatus::Completed
                } else {
                    RecordStatus::Partial
                },
                ordinal: i + 1,
                respondent: format!("User #{}", i + 1),
                columns,
            }
        })
        .collect()
}

/// What to sort report rows by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Respondent,
    Status,
    Timestamp,
    /// A column label; rows without the column sort last.
    Column(String),
}

impl std::str::FromStr for SortKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "title" | "survey" | "type" => SortKey::Title,
            "respondent" => SortKey::Respondent,
            "status" => SortKey::Status,
            "timestamp" | "date" => SortKey::Timestamp,
            _ => SortKey::Column(s.to_string()),
        })
    }
}

/// Stable ascending sort; equal keys keep their input order.
pub fn sort_rows(rows: &mut [ReportRow], key: &SortKey) {
    rows.sort_by(|a, b| match key {
        SortKey::Title => a.title.cmp(&b.title),
        SortKey::Respondent => a.ordinal.cmp(&b.ordinal),
        SortKey::Status => a.status.cmp(&b.status),
        SortKey::Timestamp => a.recorded_at.cmp(&b.recorded_at),
        SortKey::Column(label) => match (a.column(label), b.column(label)) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    });
}

/// Contact projection of a registration for the registration report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSummary {
    pub record_id: String,
    /// Registration form title, or the raw id when not in the catalog.
    pub registration_type: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub village: String,
    pub completed_at: DateTime<Utc>,
}

/// Summarize a registration's contact fields.
pub fn registration_summary(
    record: &RegistrationSubmission,
    definitions: &[FormDefinition],
) -> RegistrationSummary {
    let field = |id: &str| {
        record
            .responses
            .get(id)
            .and_then(|a| a.as_scalar())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let or_not_provided = |id: &str| field(id).unwrap_or_else(|| NOT_PROVIDED.to_string());

    let name = [field("fname"), field("lname")]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    RegistrationSummary {
        record_id: record.id.clone(),
        registration_type: definitions
            .iter()
            .find(|d| d.id == record.registration_id)
            .map(|d| d.title.clone())
            .unwrap_or_else(|| record.registration_id.clone()),
        name: if name.is_empty() {
            UNKNOWN_TITLE.to_string()
        } else {
            name
        },
        email: or_not_provided("emailId"),
        mobile: or_not_provided("mobilenumber"),
        village: or_not_provided("village"),
        completed_at: record.completed_at,
    }
}
