//! Pure traversal state machine over one form.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FormError, FormResult};
use crate::forms::{Answer, AnswerSet, FormDefinition, QuestionDefinition, QuestionKind};

/// Where a traversal currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    AtQuestion(usize),
    Submitted,
}

/// Submission lifecycle of a traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStatus {
    /// Answers can change and navigation is enabled.
    #[default]
    Open,
    /// A store write is pending; everything else is disabled.
    InFlight,
    /// The answers were stored.
    Submitted,
}

impl SubmitStatus {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitStatus::Open => "open",
            SubmitStatus::InFlight => "in_flight",
            SubmitStatus::Submitted => "submitted",
        }
    }
}

impl std::fmt::Display for SubmitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Moved to the question at this index.
    Moved(usize),
    /// At a boundary; the position is unchanged.
    Unchanged(usize),
    /// `next` on the last question: the caller submits.
    Submit,
    /// Ignored while a submission is pending.
    InFlight,
    /// Ignored after submission.
    Submitted,
}

/// Answers handed out for storage, under the record id this traversal
/// submits as.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmission {
    pub record_id: String,
    pub answers: AnswerSet,
}

/// Linear pass through a form's questions.
///
/// Starts at question 0. `next` and `previous` never leave `[0, N-1]`;
/// `next` on the last question asks the caller to submit instead.
#[derive(Debug, Clone)]
pub struct Traversal {
    form: Arc<FormDefinition>,
    index: usize,
    answers: AnswerSet,
    status: SubmitStatus,
    // Fixed by the first submit attempt so retries overwrite one record.
    record_id: Option<String>,
}

impl Traversal {
    /// Start a traversal at the first question.
    pub fn new(form: Arc<FormDefinition>) -> FormResult<Self> {
        if form.is_empty() {
            return Err(FormError::EmptyForm {
                form_id: form.id.clone(),
            });
        }
        Ok(Self {
            form,
            index: 0,
            answers: AnswerSet::new(),
            status: SubmitStatus::Open,
            record_id: None,
        })
    }

    /// The form being traversed.
    pub fn form(&self) -> &FormDefinition {
        &self.form
    }

    /// Index of the current question.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current position, `Submitted` once the answers are stored.
    pub fn position(&self) -> Position {
        match self.status {
            SubmitStatus::Submitted => Position::Submitted,
            _ => Position::AtQuestion(self.index),
        }
    }

    /// Number of questions.
    pub fn len(&self) -> usize {
        self.form.len()
    }

    /// Always false; traversals are only built over non-empty forms.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.len()
    }

    pub fn status(&self) -> SubmitStatus {
        self.status
    }

    /// Id the answers are stored under, once a submission was attempted.
    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    /// The question at the current position.
    pub fn current_question(&self) -> &QuestionDefinition {
        &self.form.questions[self.index]
    }

    /// The answer recorded for the current question, if any.
    pub fn current_answer(&self) -> Option<&Answer> {
        self.answers.get(&self.current_question().id)
    }

    /// All answers so far.
    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    /// `(index + 1) / N`.
    pub fn progress(&self) -> f64 {
        (self.index + 1) as f64 / self.len() as f64
    }

    /// "k of N" for display.
    pub fn progress_label(&self) -> String {
        format!("{} of {}", self.index + 1, self.len())
    }

    /// Answer the current question.
    pub fn answer(&mut self, answer: Answer) -> FormResult<()> {
        let id = self.current_question().id.clone();
        self.set_answer(&id, answer)
    }

    /// Answer any question of the form. Does not move.
    pub fn set_answer(&mut self, question_id: &str, answer: Answer) -> FormResult<()> {
        self.ensure_open()?;
        let question = self.question(question_id)?;
        question.validate_answer(&answer)?;
        self.answers.insert(question_id, answer);
        Ok(())
    }

    /// Remove an answer, returning it.
    pub fn clear_answer(&mut self, question_id: &str) -> FormResult<Option<Answer>> {
        self.ensure_open()?;
        self.question(question_id)?;
        Ok(self.answers.remove(question_id))
    }

    /// Tick or untick one option of the current checkboxes question.
    pub fn toggle_option(&mut self, option: &str, checked: bool) -> FormResult<()> {
        let question = self.current_question();
        if !matches!(question.kind, QuestionKind::Checkboxes { .. }) {
            return Err(FormError::InvalidAnswer {
                question_id: question.id.clone(),
                reason: format!("{} question has no options to toggle", question.question_type()),
            });
        }

        let mut selected = match self.current_answer() {
            Some(Answer::Selections(set)) => set.clone(),
            _ => BTreeSet::new(),
        };
        if checked {
            selected.insert(option.to_string());
        } else {
            selected.remove(option);
        }
        self.answer(Answer::Selections(selected))
    }

    /// Advance one question, or ask for submission on the last one.
    pub fn next(&mut self) -> Transition {
        match self.status {
            SubmitStatus::InFlight => Transition::InFlight,
            SubmitStatus::Submitted => Transition::Submitted,
            SubmitStatus::Open if self.is_last() => Transition::Submit,
            SubmitStatus::Open => {
                self.index += 1;
                Transition::Moved(self.index)
            }
        }
    }

    /// Go back one question; a no-op on the first.
    pub fn previous(&mut self) -> Transition {
        match self.status {
            SubmitStatus::InFlight => Transition::InFlight,
            SubmitStatus::Submitted => Transition::Submitted,
            SubmitStatus::Open if self.is_first() => Transition::Unchanged(self.index),
            SubmitStatus::Open => {
                self.index -= 1;
                Transition::Moved(self.index)
            }
        }
    }

    /// Required questions without a non-empty answer, in form order.
    pub fn missing_required(&self) -> Vec<String> {
        self.form
            .required_ids()
            .filter(|id| !self.answers.is_answered(id))
            .map(str::to_string)
            .collect()
    }

    /// Lock the traversal for submission and hand out the answers to store.
    ///
    /// Every attempt on the same pass carries the same record id.
    pub fn begin_submit(&mut self) -> FormResult<PendingSubmission> {
        self.ensure_open()?;
        if !self.is_last() {
            return Err(FormError::NotAtLastQuestion {
                form_id: self.form.id.clone(),
            });
        }
        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(FormError::MissingRequired { fields: missing });
        }
        let record_id = self
            .record_id
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone();
        self.status = SubmitStatus::InFlight;
        Ok(PendingSubmission {
            record_id,
            answers: self.answers.clone(),
        })
    }

    /// Settle a pending submission. On failure the traversal reopens at the
    /// last question with its answers intact.
    pub fn finish_submit(&mut self, stored: bool) {
        if self.status != SubmitStatus::InFlight {
            return;
        }
        self.status = if stored {
            SubmitStatus::Submitted
        } else {
            SubmitStatus::Open
        };
    }

    /// Start over on the same form with no answers.
    pub fn restart(&mut self) -> FormResult<()> {
        if self.status == SubmitStatus::InFlight {
            return Err(FormError::SessionClosed {
                form_id: self.form.id.clone(),
            });
        }
        self.index = 0;
        self.answers = AnswerSet::new();
        self.status = SubmitStatus::Open;
        self.record_id = None;
        Ok(())
    }

    fn question(&self, question_id: &str) -> FormResult<&QuestionDefinition> {
        self.form
            .question(question_id)
            .ok_or_else(|| FormError::UnknownQuestion {
                question_id: question_id.to_string(),
            })
    }

    fn ensure_open(&self) -> FormResult<()> {
        if self.status != SubmitStatus::Open {
            return Err(FormError::SessionClosed {
                form_id: self.form.id.clone(),
            });
        }
        Ok(())
    }
}
