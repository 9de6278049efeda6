//! Terminal shell over the catalog, traversal and reporting layers.
//!
//! Each subcommand renders its result into a [`CliResult`]; interactive
//! commands additionally read answers line by line from the given input.

use std::collections::BTreeSet;
use std::io::{BufRead, Write};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{Config, DatabaseConfig};
use crate::error::{AppError, AppResult, FormError, FormResult};
use crate::forms::{Answer, FormCatalog, FormDefinition, FormKind, QuestionDefinition, QuestionKind};
use crate::reports::{
    chart_series, count_by_form, registration_summary, sort_rows, to_detail_rows, to_report_rows,
    FieldLabels, FormRecord, RegistrationSummary, ReportColumn, ReportRow, SortKey,
};
use crate::storage::{Collection, SqliteStorage, Storage, StoreHandle, LATEST_SCHEMA_VERSION};
use crate::traversal::{FormSession, Step};

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(name = "survey-collector", version)]
#[command(about = "Offline survey and registration data collection")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Shell subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List surveys and registration forms with their record counts
    Forms,

    /// Take a survey interactively
    Take {
        /// Survey id as shown by `forms`
        survey_id: String,
    },

    /// Fill in a registration form interactively
    Register {
        /// Registration form id as shown by `forms`
        registration_id: String,
    },

    /// Show response counts per survey
    Analytics {
        /// Print chart input as JSON
        #[arg(long)]
        json: bool,
    },

    /// Tabular report of stored records
    Report {
        /// Which collection to report on
        #[arg(value_enum)]
        target: ReportTarget,

        /// Sort by title, respondent, status, date, or a column label
        #[arg(long)]
        sort: Option<String>,

        /// Print rows as JSON
        #[arg(long)]
        json: bool,

        /// Show every answer, including multi-select ones
        #[arg(long)]
        detail: bool,
    },

    /// Show the database schema version
    Schema,
}

/// Collection a report covers.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTarget {
    Responses,
    Registrations,
}

/// Result of CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Everything a command needs: the catalog, display labels and the store.
pub struct AppContext {
    pub catalog: FormCatalog,
    /// Question texts of the surveys.
    pub survey_labels: FieldLabels,
    /// Field labels of the registration forms.
    pub registration_labels: FieldLabels,
    pub store: StoreHandle,
}

impl AppContext {
    /// Load the catalog and labels. The store is opened on first use.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let catalog = FormCatalog::load(&config.catalog)?;
        let overrides = match &config.catalog.field_labels_path {
            Some(path) => Some(FieldLabels::load(path)?),
            None => None,
        };
        Ok(Self::new(catalog, overrides, config.database.clone()))
    }

    /// Build labels per form kind from the catalog, with `overrides` applied
    /// to both.
    pub fn new(
        catalog: FormCatalog,
        overrides: Option<FieldLabels>,
        database: DatabaseConfig,
    ) -> Self {
        let mut survey_labels = FieldLabels::from_forms(catalog.surveys());
        let mut registration_labels = FieldLabels::from_forms(catalog.registrations());
        if let Some(overrides) = overrides {
            survey_labels = survey_labels.with_overrides(overrides.clone());
            registration_labels = registration_labels.with_overrides(overrides);
        }
        Self {
            catalog,
            survey_labels,
            registration_labels,
            store: StoreHandle::new(database),
        }
    }

    /// Labels for answers to forms of this kind.
    pub fn labels(&self, kind: FormKind) -> &FieldLabels {
        match kind {
            FormKind::Survey => &self.survey_labels,
            FormKind::Registration => &self.registration_labels,
        }
    }

    async fn storage(&self) -> Result<SqliteStorage, CliResult> {
        self.store
            .acquire()
            .await
            .map_err(|e| CliResult::error(format!("Cannot open the database: {}", e)))
    }
}

/// Execute a CLI command.
pub async fn execute_command<R: BufRead, W: Write>(
    command: Commands,
    ctx: &AppContext,
    input: &mut R,
    output: &mut W,
) -> CliResult {
    let result = match command {
        Commands::Forms => execute_forms(ctx).await,
        Commands::Take { survey_id } => {
            execute_traversal(ctx, FormKind::Survey, &survey_id, input, output).await
        }
        Commands::Register { registration_id } => {
            execute_traversal(ctx, FormKind::Registration, &registration_id, input, output).await
        }
        Commands::Analytics { json } => execute_analytics(ctx, json).await,
        Commands::Report {
            target,
            sort,
            json,
            detail,
        } => execute_report(ctx, target, sort.as_deref(), json, detail).await,
        Commands::Schema => execute_schema(ctx).await,
    };
    result.unwrap_or_else(|failure| failure)
}

type Outcome = Result<CliResult, CliResult>;

fn storage_failure(e: impl Into<AppError>) -> CliResult {
    let e = e.into();
    warn!(error = %e, "Command failed");
    CliResult::error(e.to_string())
}

async fn execute_forms(ctx: &AppContext) -> Outcome {
    let storage = ctx.storage().await?;
    let mut output = String::new();

    for (kind, collection) in [
        (FormKind::Survey, Collection::Responses),
        (FormKind::Registration, Collection::Registrations),
    ] {
        output.push_str(&format!("\n{}s\n", kind.label()));
        output.push_str("───────────────────────────────────────────────\n");
        for form in ctx.catalog.forms(kind) {
            let count = match storage.count_by_index(collection, &form.id).await {
                Ok(n) => n.to_string(),
                Err(e) => {
                    debug!(form_id = %form.id, error = %e, "Count unavailable");
                    "n/a".to_string()
                }
            };
            output.push_str(&format!(
                "  {:<32} {:>5}  {}\n",
                form.id, count, form.title
            ));
        }
    }

    Ok(CliResult::success(output))
}

async fn execute_traversal<R: BufRead, W: Write>(
    ctx: &AppContext,
    kind: FormKind,
    form_id: &str,
    input: &mut R,
    output: &mut W,
) -> Outcome {
    // Resolve the form before touching the store.
    let form = ctx
        .catalog
        .get(kind, form_id)
        .map_err(|e| CliResult::error(e.to_string()))?;
    let storage = ctx.storage().await?;
    let session = FormSession::start(&ctx.catalog, kind, &form.id, storage)
        .map_err(|e| CliResult::error(e.to_string()))?;

    writeln_header(output, form).map_err(io_failure)?;
    run_session(session, input, output).await.map_err(io_failure)
}

fn writeln_header<W: Write>(output: &mut W, form: &FormDefinition) -> std::io::Result<()> {
    writeln!(output, "{}", form.title)?;
    if !form.description.is_empty() {
        writeln!(output, "{}", form.description)?;
    }
    writeln!(
        output,
        "Press Enter to continue, '<' to go back, ':q' to quit without saving."
    )
}

fn io_failure(e: std::io::Error) -> CliResult {
    CliResult::error(format!("Terminal I/O failed: {}", e))
}

/// Drive a session from line-based input until it is submitted or abandoned.
///
/// After a registration is stored the user may start another one on the
/// same form.
pub async fn run_session<S: Storage, R: BufRead, W: Write>(
    session: FormSession<S>,
    input: &mut R,
    output: &mut W,
) -> std::io::Result<CliResult> {
    let kind = session.kind();
    let mut saved: Vec<String> = Vec::new();
    loop {
        let question = session.current_question();
        writeln!(output)?;
        writeln!(
            output,
            "[{}] {}{}",
            session.progress_label(),
            question.text,
            if question.required { " *" } else { "" }
        )?;
        if let Some(options) = question.kind.options() {
            for (i, option) in options.iter().enumerate() {
                writeln!(output, "  {}. {}", i + 1, option)?;
            }
        }
        if let QuestionKind::Rating { max } = question.kind {
            writeln!(output, "  (1-{})", max)?;
        }
        if let Some(current) = session.answers().get(&question.id) {
            writeln!(output, "  current: {}", current)?;
        } else if let Some(placeholder) = &question.placeholder {
            writeln!(output, "  {}", placeholder)?;
        }
        write!(output, "> ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            session.abandon();
            if !saved.is_empty() {
                return Ok(saved_summary(kind, &saved));
            }
            return Ok(CliResult::error("Input closed; nothing was saved"));
        }

        match line.trim() {
            ":q" | ":quit" => {
                session.abandon();
                if !saved.is_empty() {
                    return Ok(saved_summary(kind, &saved));
                }
                return Ok(CliResult::success("Abandoned; nothing was saved"));
            }
            "<" => {
                session.previous();
                continue;
            }
            "" => {}
            text => {
                if let Err(e) = parse_answer(&question, text).and_then(|a| session.answer(a)) {
                    writeln!(output, "  {}", e)?;
                    continue;
                }
            }
        }

        match session.next().await {
            Ok(Step::Question(_)) | Ok(Step::InFlight) => {}
            Ok(Step::Submitted(submission)) => {
                saved.push(submission.id().to_string());
                if kind == FormKind::Registration && ask_another(kind, input, output)? {
                    match session.restart() {
                        Ok(()) => continue,
                        Err(e) => writeln!(output, "  {}", e)?,
                    }
                }
                return Ok(saved_summary(kind, &saved));
            }
            Ok(Step::AlreadySubmitted) => {
                return Ok(CliResult::success("Already submitted"));
            }
            Err(AppError::Form(e)) => {
                writeln!(output, "  {}", e)?;
            }
            Err(e) => {
                writeln!(output, "  Could not save: {}. Press Enter to retry.", e)?;
            }
        }
    }
}

fn ask_another<R: BufRead, W: Write>(
    kind: FormKind,
    input: &mut R,
    output: &mut W,
) -> std::io::Result<bool> {
    writeln!(output)?;
    write!(
        output,
        "{} saved. Add another {}? [y/N] ",
        kind.label(),
        kind.label().to_lowercase()
    )?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(false);
    }
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn saved_summary(kind: FormKind, saved: &[String]) -> CliResult {
    match saved {
        [id] => CliResult::success(format!("Thank you! {} saved as {}", kind.label(), id)),
        ids => CliResult::success(format!(
            "Thank you! {} {}s saved: {}",
            ids.len(),
            kind.label().to_lowercase(),
            ids.join(", ")
        )),
    }
}

/// Parse one line of input as an answer to `question`.
///
/// Choice questions accept an option number or its label; checkboxes take a
/// comma-separated list of either.
pub fn parse_answer(question: &QuestionDefinition, input: &str) -> FormResult<Answer> {
    let input = input.trim();
    let invalid = |reason: String| FormError::InvalidAnswer {
        question_id: question.id.clone(),
        reason,
    };

    let answer = match &question.kind {
        QuestionKind::Text | QuestionKind::Textarea => Answer::text(input),
        QuestionKind::Rating { max } => Answer::Number(
            input
                .parse()
                .map_err(|_| invalid(format!("enter a number from 1 to {}", max)))?,
        ),
        QuestionKind::MultipleChoice { options } | QuestionKind::Dropdown { options } => {
            Answer::Text(
                pick_option(options, input)
                    .ok_or_else(|| invalid(format!("'{}' is not one of the options", input)))?,
            )
        }
        QuestionKind::Checkboxes { options } => {
            let picked: BTreeSet<String> = input
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    pick_option(options, s)
                        .ok_or_else(|| invalid(format!("'{}' is not one of the options", s)))
                })
                .collect::<FormResult<_>>()?;
            Answer::Selections(picked)
        }
    };

    question.validate_answer(&answer)?;
    Ok(answer)
}

fn pick_option(options: &[String], input: &str) -> Option<String> {
    if let Ok(n) = input.parse::<usize>() {
        if (1..=options.len()).contains(&n) {
            return Some(options[n - 1].clone());
        }
    }
    options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(input))
        .cloned()
}

async fn execute_analytics(ctx: &AppContext, json: bool) -> Outcome {
    let storage = ctx.storage().await?;
    let responses = storage.get_all_responses().await.map_err(storage_failure)?;
    let counts = count_by_form(&responses, ctx.catalog.surveys());

    if json {
        let body = serde_json::to_string_pretty(&chart_series(&counts))
            .map_err(|e| CliResult::error(e.to_string()))?;
        return Ok(CliResult::success(body));
    }

    let mut output = String::new();
    output.push_str("\nResponses per survey\n");
    output.push_str("───────────────────────────────────────────────\n");
    let widest = counts.forms().iter().map(|c| c.count).max().unwrap_or(0).max(1);
    for point in chart_series(&counts) {
        let bar = "█".repeat(((point.value * 30) / widest) as usize);
        output.push_str(&format!("  {:<36} {:>5}  {}\n", point.label, point.value, bar));
    }
    if counts.unmatched() > 0 {
        output.push_str(&format!(
            "  {:<36} {:>5}\n",
            "(surveys no longer in catalog)",
            counts.unmatched()
        ));
    }
    output.push_str(&format!("\nTotal responses: {}\n", counts.total()));

    Ok(CliResult::success(output))
}

#[derive(Serialize)]
struct RegistrationReportEntry {
    #[serde(flatten)]
    summary: RegistrationSummary,
    columns: Vec<ReportColumn>,
}

async fn execute_report(
    ctx: &AppContext,
    target: ReportTarget,
    sort: Option<&str>,
    json: bool,
    detail: bool,
) -> Outcome {
    let storage = ctx.storage().await?;
    let sort_key: Option<SortKey> = sort.and_then(|s| s.parse().ok());

    match target {
        ReportTarget::Responses => {
            let responses = storage.get_all_responses().await.map_err(storage_failure)?;
            let mut rows = report_rows(
                &responses,
                ctx.catalog.surveys(),
                ctx.labels(FormKind::Survey),
                detail,
            );
            if let Some(key) = &sort_key {
                sort_rows(&mut rows, key);
            }

            if json {
                return serde_json::to_string_pretty(&rows)
                    .map(CliResult::success)
                    .map_err(|e| CliResult::error(e.to_string()));
            }

            let mut output = format!("\n{} survey responses\n", rows.len());
            for row in &rows {
                output.push_str(&format!(
                    "\n{} | {} | {} | {}\n",
                    row.title,
                    row.respondent,
                    row.status,
                    row.recorded_at.format("%Y-%m-%d %H:%M")
                ));
                push_columns(&mut output, &row.columns);
            }
            Ok(CliResult::success(output))
        }
        ReportTarget::Registrations => {
            let registrations = storage
                .get_all_registrations()
                .await
                .map_err(storage_failure)?;
            let definitions = ctx.catalog.registrations();
            let mut rows = report_rows(
                &registrations,
                definitions,
                ctx.labels(FormKind::Registration),
                detail,
            );
            if let Some(key) = &sort_key {
                sort_rows(&mut rows, key);
            }

            // Rows carry 1-based ordinals into `registrations`.
            let entries: Vec<RegistrationReportEntry> = rows
                .into_iter()
                .map(|row| RegistrationReportEntry {
                    summary: registration_summary(&registrations[row.ordinal - 1], definitions),
                    columns: row.columns,
                })
                .collect();

            if json {
                return serde_json::to_string_pretty(&entries)
                    .map(CliResult::success)
                    .map_err(|e| CliResult::error(e.to_string()));
            }

            let mut output = format!("\n{} registrations\n\n", entries.len());
            output.push_str(&format!(
                "  {:<24} {:<24} {:<28} {:<14} {:<16} {}\n",
                "Registration Type", "Name", "Email", "Mobile", "Village", "Submitted"
            ));
            for RegistrationReportEntry { summary, columns } in &entries {
                output.push_str(&format!(
                    "  {:<24} {:<24} {:<28} {:<14} {:<16} {}\n",
                    summary.registration_type,
                    summary.name,
                    summary.email,
                    summary.mobile,
                    summary.village,
                    summary.completed_at.format("%Y-%m-%d")
                ));
                push_columns(&mut output, columns);
            }
            Ok(CliResult::success(output))
        }
    }
}

fn report_rows<R: FormRecord>(
    records: &[R],
    definitions: &[FormDefinition],
    labels: &FieldLabels,
    detail: bool,
) -> Vec<ReportRow> {
    if detail {
        to_detail_rows(records, definitions, labels)
    } else {
        to_report_rows(records, definitions, labels)
    }
}

fn push_columns(output: &mut String, columns: &[ReportColumn]) {
    for column in columns {
        output.push_str(&format!("    {}: {}\n", column.label, column.value));
    }
}

async fn execute_schema(ctx: &AppContext) -> Outcome {
    let storage = ctx.storage().await?;
    Ok(CliResult::success(format!(
        "Database: {}\nSchema version: {} (latest known: {})",
        ctx.store.config().path.display(),
        storage.schema_version(),
        LATEST_SCHEMA_VERSION
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{baseline_survey, AnswerSet};
    use crate::storage::{NewRegistration, NewResponse};
    use std::io::Cursor;
    use std::sync::Arc;

    fn database(dir: &tempfile::TempDir) -> DatabaseConfig {
        DatabaseConfig {
            path: dir.path().join("cli.db"),
            max_connections: 1,
            schema_version: LATEST_SCHEMA_VERSION,
        }
    }

    fn context(dir: &tempfile::TempDir) -> AppContext {
        AppContext::new(FormCatalog::builtin(), None, database(dir))
    }

    async fn report(ctx: &AppContext, target: ReportTarget, detail: bool) -> CliResult {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        execute_command(
            Commands::Report {
                target,
                sort: None,
                json: false,
                detail,
            },
            ctx,
            &mut input,
            &mut output,
        )
        .await
    }

    #[test]
    fn test_parse_answer_by_number_or_label() {
        let q = QuestionDefinition::dropdown("gender", "Gender", &["Male", "Female"]);
        assert_eq!(parse_answer(&q, "2").unwrap(), Answer::text("Female"));
        assert_eq!(parse_answer(&q, "male").unwrap(), Answer::text("Male"));
        assert!(parse_answer(&q, "3").is_err());
    }

    #[test]
    fn test_parse_checkbox_list() {
        let q = QuestionDefinition::new(
            "days",
            "Days",
            QuestionKind::Checkboxes {
                options: vec!["Mon".to_string(), "Tue".to_string(), "Wed".to_string()],
            },
        );
        assert_eq!(
            parse_answer(&q, "1, wed").unwrap(),
            Answer::selections(["Mon", "Wed"])
        );
        assert!(parse_answer(&q, "Mon, Fri").is_err());
    }

    #[test]
    fn test_parse_rating() {
        let q = QuestionDefinition::new("r", "Rate", QuestionKind::Rating { max: 5 });
        assert_eq!(parse_answer(&q, "5").unwrap(), Answer::Number(5));
        assert!(parse_answer(&q, "6").is_err());
        assert!(parse_answer(&q, "five").is_err());
    }

    #[tokio::test]
    async fn test_run_session_submits_from_lines() {
        let store = SqliteStorage::new_in_memory().await.unwrap();
        let form = Arc::new(FormDefinition::new(
            "survey-A",
            "Survey A",
            "",
            vec![
                QuestionDefinition::text("q1", "Name?"),
                QuestionDefinition::new("q2", "Rate", QuestionKind::Rating { max: 5 }),
            ],
        ));
        let session = FormSession::new(FormKind::Survey, form, store.clone()).unwrap();

        // "9" is rejected and re-asked; "<" goes back and Enter keeps the answer.
        let mut input = Cursor::new("Asha\n9\n<\n\n4\n");
        let mut output = Vec::new();
        let result = run_session(session, &mut input, &mut output).await.unwrap();

        assert_eq!(result.exit_code, 0, "{}", result.message);
        let stored = store.get_all_responses().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].answers.get("q1"), Some(&Answer::text("Asha")));
        assert_eq!(stored[0].answers.get("q2"), Some(&Answer::Number(4)));
    }

    #[tokio::test]
    async fn test_quit_saves_nothing() {
        let store = SqliteStorage::new_in_memory().await.unwrap();
        let session =
            FormSession::new(FormKind::Survey, Arc::new(baseline_survey()), store.clone()).unwrap();

        let mut input = Cursor::new("Asha\n:q\n");
        let mut output = Vec::new();
        let result = run_session(session, &mut input, &mut output).await.unwrap();

        assert_eq!(result.exit_code, 0);
        assert!(store.get_all_responses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_another_stores_two_records() {
        let store = SqliteStorage::new_in_memory().await.unwrap();
        let form = Arc::new(FormDefinition::new(
            "reg",
            "Reg",
            "",
            vec![QuestionDefinition::text("fname", "First name").required()],
        ));
        let session = FormSession::new(FormKind::Registration, form, store.clone()).unwrap();

        let mut input = Cursor::new("Asha\ny\nRavi\nn\n");
        let mut output = Vec::new();
        let result = run_session(session, &mut input, &mut output).await.unwrap();

        assert_eq!(result.exit_code, 0, "{}", result.message);
        assert!(result.message.contains("2 registrations saved"));
        let stored = store.get_all_registrations().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].responses.get("fname"), Some(&Answer::text("Asha")));
        assert_eq!(stored[1].responses.get("fname"), Some(&Answer::text("Ravi")));
        assert_ne!(stored[0].id, stored[1].id);
    }

    #[tokio::test]
    async fn test_quit_after_saved_registration_reports_it() {
        let store = SqliteStorage::new_in_memory().await.unwrap();
        let form = Arc::new(FormDefinition::new(
            "reg",
            "Reg",
            "",
            vec![QuestionDefinition::text("fname", "First name")],
        ));
        let session = FormSession::new(FormKind::Registration, form, store.clone()).unwrap();

        let mut input = Cursor::new("Asha\nyes\n:q\n");
        let mut output = Vec::new();
        let result = run_session(session, &mut input, &mut output).await.unwrap();

        assert_eq!(result.exit_code, 0);
        assert!(result.message.starts_with("Thank you! Registration saved as"));
        assert_eq!(store.get_all_registrations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_survey_and_registration_labels_stay_apart() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = FormCatalog::new(
            vec![FormDefinition::new(
                "sv",
                "SV",
                "",
                vec![QuestionDefinition::text("q1", "How old is the school building?")],
            )],
            vec![FormDefinition::new(
                "rg",
                "RG",
                "",
                vec![QuestionDefinition::text("q1", "First Name")],
            )],
        )
        .unwrap();
        let ctx = AppContext::new(catalog, None, database(&dir));
        let storage = ctx.storage().await.unwrap();
        let answers: AnswerSet = [("q1", Answer::text("20 years"))].into_iter().collect();
        storage
            .put_response(NewResponse::new("sv", answers.clone()))
            .await
            .unwrap();
        storage
            .put_registration(NewRegistration::new("rg", answers))
            .await
            .unwrap();

        let result = report(&ctx, ReportTarget::Responses, false).await;
        assert_eq!(result.exit_code, 0, "{}", result.message);
        assert!(result.message.contains("How old is the school building?: 20 years"));
        assert!(!result.message.contains("First Name"));

        let result = report(&ctx, ReportTarget::Registrations, false).await;
        assert!(result.message.contains("First Name: 20 years"));
        assert!(!result.message.contains("How old is the school building?"));
    }

    #[tokio::test]
    async fn test_detail_report_shows_selections() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        let storage = ctx.storage().await.unwrap();
        let answers: AnswerSet = [
            ("facilities", Answer::selections(["Primary school", "Drinking water"])),
        ]
        .into_iter()
        .collect();
        storage
            .put_response(NewResponse::new(baseline_survey().id, answers))
            .await
            .unwrap();

        let label = "Which facilities are available in the village?";
        let result = report(&ctx, ReportTarget::Responses, false).await;
        assert!(!result.message.contains(label));

        let result = report(&ctx, ReportTarget::Responses, true).await;
        assert!(result
            .message
            .contains(&format!("{}: Drinking water, Primary school", label)));
    }

    #[tokio::test]
    async fn test_unknown_survey_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        let mut input = Cursor::new("");
        let mut output = Vec::new();

        let result = execute_command(
            Commands::Take {
                survey_id: "missing".to_string(),
            },
            &ctx,
            &mut input,
            &mut output,
        )
        .await;
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.message, "Survey not found: missing");
        assert!(!ctx.store.is_open());
    }

    #[tokio::test]
    async fn test_forms_and_schema_commands() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);
        let mut input = Cursor::new("");
        let mut output = Vec::new();

        let result = execute_command(Commands::Forms, &ctx, &mut input, &mut output).await;
        assert_eq!(result.exit_code, 0);
        assert!(result.message.contains("baseline-survey-adarsh-sanch"));
        assert!(result.message.contains("student-registration-form"));

        let result = execute_command(Commands::Schema, &ctx, &mut input, &mut output).await;
        assert!(result
            .message
            .contains(&format!("Schema version: {}", LATEST_SCHEMA_VERSION)));
    }
}
