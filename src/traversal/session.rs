use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::state::{PendingSubmission, Position, SubmitStatus, Transition, Traversal};
use crate::error::{AppResult, FormResult, StorageResult};
use crate::forms::{Answer, AnswerSet, FormCatalog, FormDefinition, FormKind, QuestionDefinition};
use crate::storage::{
    NewRegistration, NewResponse, RegistrationSubmission, Storage, SubmittedResponse,
};

/// A record produced by a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Submission {
    Response(SubmittedResponse),
    Registration(RegistrationSubmission),
}

impl Submission {
    /// Store-assigned record id.
    pub fn id(&self) -> &str {
        match self {
            Submission::Response(r) => &r.id,
            Submission::Registration(r) => &r.id,
        }
    }

    /// Form the record belongs to.
    pub fn form_id(&self) -> &str {
        match self {
            Submission::Response(r) => &r.survey_id,
            Submission::Registration(r) => &r.registration_id,
        }
    }
}

/// Result of [`FormSession::next`].
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Now at this question (possibly unchanged).
    Question(usize),
    /// The answers were stored.
    Submitted(Submission),
    /// Ignored: another submission is still pending.
    InFlight,
    /// Ignored: this session already submitted.
    AlreadySubmitted,
}

/// One user's pass through a survey or registration form, bound to a store.
///
/// All methods take `&self` so a session can be shared between concurrent
/// callers; at most one submission is ever in flight.
pub struct FormSession<S> {
    kind: FormKind,
    store: S,
    state: Mutex<Traversal>,
}

impl<S: Storage> FormSession<S> {
    /// Begin a session over the catalog form `form_id`.
    pub fn start(catalog: &FormCatalog, kind: FormKind, form_id: &str, store: S) -> FormResult<Self> {
        let form = catalog.get(kind, form_id)?;
        Self::new(kind, Arc::new(form.clone()), store)
    }

    /// Begin a session over an explicit form definition.
    pub fn new(kind: FormKind, form: Arc<FormDefinition>, store: S) -> FormResult<Self> {
        form.validate()?;
        let traversal = Traversal::new(form)?;
        debug!(
            kind = %kind,
            form_id = %traversal.form().id,
            questions = traversal.len(),
            "Session started"
        );
        Ok(Self {
            kind,
            store,
            state: Mutex::new(traversal),
        })
    }

    pub fn kind(&self) -> FormKind {
        self.kind
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run `f` against the current traversal state.
    pub fn inspect<R>(&self, f: impl FnOnce(&Traversal) -> R) -> R {
        f(&*self.lock())
    }

    pub fn form_id(&self) -> String {
        self.lock().form().id.clone()
    }

    pub fn index(&self) -> usize {
        self.lock().index()
    }

    pub fn position(&self) -> Position {
        self.lock().position()
    }

    pub fn status(&self) -> SubmitStatus {
        self.lock().status()
    }

    pub fn progress(&self) -> f64 {
        self.lock().progress()
    }

    pub fn progress_label(&self) -> String {
        self.lock().progress_label()
    }

    pub fn current_question(&self) -> QuestionDefinition {
        self.lock().current_question().clone()
    }

    pub fn answers(&self) -> AnswerSet {
        self.lock().answers().clone()
    }

    /// Answer the current question.
    pub fn answer(&self, answer: Answer) -> FormResult<()> {
        self.lock().answer(answer)
    }

    /// Answer a question by id.
    pub fn set_answer(&self, question_id: &str, answer: Answer) -> FormResult<()> {
        self.lock().set_answer(question_id, answer)
    }

    pub fn clear_answer(&self, question_id: &str) -> FormResult<Option<Answer>> {
        self.lock().clear_answer(question_id)
    }

    pub fn toggle_option(&self, option: &str, checked: bool) -> FormResult<()> {
        self.lock().toggle_option(option, checked)
    }

    /// Go back one question.
    pub fn previous(&self) -> Step {
        match self.lock().previous() {
            Transition::Moved(i) | Transition::Unchanged(i) => Step::Question(i),
            Transition::InFlight => Step::InFlight,
            Transition::Submitted | Transition::Submit => Step::AlreadySubmitted,
        }
    }

    /// Advance, or submit when on the last question.
    ///
    /// A failed write leaves the session on the last question with every
    /// answer kept, so calling `next` again retries. Dropping the returned
    /// future mid-write has the same effect. Retries reuse the record id, so
    /// a write that landed anyway is overwritten rather than duplicated.
    pub async fn next(&self) -> AppResult<Step> {
        let (form_id, pending) = {
            let mut state = self.lock();
            match state.next() {
                Transition::Moved(i) | Transition::Unchanged(i) => return Ok(Step::Question(i)),
                Transition::InFlight => {
                    debug!(form_id = %state.form().id, "Submission already in flight; ignoring");
                    return Ok(Step::InFlight);
                }
                Transition::Submitted => return Ok(Step::AlreadySubmitted),
                Transition::Submit => {}
            }
            let pending = state.begin_submit()?;
            (state.form().id.clone(), pending)
        };

        let guard = InFlightGuard {
            state: &self.state,
            armed: true,
        };

        match self.write(&form_id, pending).await {
            Ok(submission) => {
                guard.settle(true);
                info!(
                    kind = %self.kind,
                    form_id = %form_id,
                    id = %submission.id(),
                    "Submission stored"
                );
                Ok(Step::Submitted(submission))
            }
            Err(e) => {
                guard.settle(false);
                warn!(
                    kind = %self.kind,
                    form_id = %form_id,
                    error = %e,
                    "Submission failed; answers kept for retry"
                );
                Err(e.into())
            }
        }
    }

    /// Start the same form over with no answers.
    pub fn restart(&self) -> FormResult<()> {
        self.lock().restart()
    }

    /// Leave without storing anything.
    pub fn abandon(self) {
        let state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        debug!(
            form_id = %state.form().id,
            answered = state.answers().len(),
            "Session abandoned"
        );
    }

    async fn write(&self, form_id: &str, pending: PendingSubmission) -> StorageResult<Submission> {
        let PendingSubmission { record_id, answers } = pending;
        match self.kind {
            FormKind::Survey => self
                .store
                .put_response(NewResponse::new(form_id, answers).with_id(record_id))
                .await
                .map(Submission::Response),
            FormKind::Registration => self
                .store
                .put_registration(NewRegistration::new(form_id, answers).with_id(record_id))
                .await
                .map(Submission::Registration),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Traversal> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Reopens the traversal if the submitting future is dropped before settling.
struct InFlightGuard<'a> {
    state: &'a Mutex<Traversal>,
    armed: bool,
}

impl InFlightGuard<'_> {
    fn settle(mut self, stored: bool) {
        self.armed = false;
        self.finish(stored);
    }

    fn finish(&self, stored: bool) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .finish_submit(stored);
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.finish(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, FormError};
    use crate::forms::{QuestionKind, STUDENT_REGISTRATION_FORM_ID};
    use crate::storage::SqliteStorage;

    fn two_question_form() -> Arc<FormDefinition> {
        Arc::new(FormDefinition::new(
            "survey-A",
            "Survey A",
            "",
            vec![
                QuestionDefinition::text("q1", "Name?"),
                QuestionDefinition::new("q2", "Rate", QuestionKind::Rating { max: 5 }),
            ],
        ))
    }

    #[tokio::test]
    async fn test_next_moves_then_submits_response() {
        let store = SqliteStorage::new_in_memory().await.unwrap();
        let session = FormSession::new(FormKind::Survey, two_question_form(), store).unwrap();

        session.answer(Answer::text("hello")).unwrap();
        assert_eq!(session.next().await.unwrap(), Step::Question(1));
        session.answer(Answer::Number(4)).unwrap();

        let step = session.next().await.unwrap();
        let record = match step {
            Step::Submitted(Submission::Response(record)) => record,
            other => panic!("expected a stored response, got {:?}", other),
        };
        assert_eq!(record.survey_id, "survey-A");
        assert_eq!(record.answers.get("q2"), Some(&Answer::Number(4)));
        assert!(record.completed);
        assert_eq!(session.position(), Position::Submitted);

        assert_eq!(session.next().await.unwrap(), Step::AlreadySubmitted);
        assert_eq!(session.store().get_all_responses().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_registration_routes_to_registrations() {
        let store = SqliteStorage::new_in_memory().await.unwrap();
        let catalog = FormCatalog::builtin();
        let session = FormSession::start(
            &catalog,
            FormKind::Registration,
            STUDENT_REGISTRATION_FORM_ID,
            store,
        )
        .unwrap();

        session.set_answer("fname", Answer::text("Asha")).unwrap();
        session.set_answer("lname", Answer::text("Patil")).unwrap();
        session.set_answer("gender", Answer::text("Female")).unwrap();
        session.set_answer("fathername", Answer::text("Ravi")).unwrap();
        session
            .set_answer("mobilenumber", Answer::text("9876543210"))
            .unwrap();
        session.set_answer("village", Answer::text("Sanch")).unwrap();

        let mut step = Step::Question(0);
        while let Step::Question(_) = step {
            step = session.next().await.unwrap();
        }
        let submission = match step {
            Step::Submitted(submission) => submission,
            other => panic!("expected submission, got {:?}", other),
        };
        assert_eq!(submission.form_id(), STUDENT_REGISTRATION_FORM_ID);
        assert!(matches!(submission, Submission::Registration(_)));
        assert!(session.store().get_all_responses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_required_keeps_session_open() {
        let store = SqliteStorage::new_in_memory().await.unwrap();
        let form = Arc::new(FormDefinition::new(
            "reg",
            "Reg",
            "",
            vec![QuestionDefinition::text("fname", "First name").required()],
        ));
        let session = FormSession::new(FormKind::Registration, form, store).unwrap();

        let err = session.next().await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Form(FormError::MissingRequired { .. })
        ));
        assert_eq!(session.status(), SubmitStatus::Open);
        assert!(session.store().get_all_registrations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_form_is_not_found() {
        let store = SqliteStorage::new_in_memory().await.unwrap();
        let result = FormSession::start(&FormCatalog::builtin(), FormKind::Survey, "nope", store);
        assert!(matches!(result, Err(FormError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_explicit_form_is_validated() {
        let store = SqliteStorage::new_in_memory().await.unwrap();
        let duplicate = Arc::new(FormDefinition::new(
            "dup",
            "Dup",
            "",
            vec![
                QuestionDefinition::text("q1", "First"),
                QuestionDefinition::text("q1", "Again"),
            ],
        ));
        let result = FormSession::new(FormKind::Survey, duplicate, store.clone());
        assert!(matches!(result, Err(FormError::InvalidDefinition { .. })));

        let no_scale = Arc::new(FormDefinition::new(
            "rate",
            "Rate",
            "",
            vec![QuestionDefinition::new("r", "Rate", QuestionKind::Rating { max: 0 })],
        ));
        let result = FormSession::new(FormKind::Survey, no_scale, store);
        assert!(matches!(result, Err(FormError::InvalidDefinition { .. })));
    }

    #[tokio::test]
    async fn test_previous_at_start() {
        let store = SqliteStorage::new_in_memory().await.unwrap();
        let session = FormSession::new(FormKind::Survey, two_question_form(), store).unwrap();
        assert_eq!(session.previous(), Step::Question(0));
        assert_eq!(session.progress_label(), "1 of 2");
    }
}
