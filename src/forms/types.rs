//! Data types for form definitions and answers.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{FormError, FormResult};

/// A survey or registration form: an ordered list of questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    /// Identifier, unique within its catalog.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Questions in traversal order.
    pub questions: Vec<QuestionDefinition>,
}

impl FormDefinition {
    /// Create a form with the given questions.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        questions: Vec<QuestionDefinition>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            questions,
        }
    }

    /// Number of questions.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the form has no questions.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&QuestionDefinition> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Ids of required questions.
    pub fn required_ids(&self) -> impl Iterator<Item = &str> {
        self.questions
            .iter()
            .filter(|q| q.required)
            .map(|q| q.id.as_str())
    }

    /// Check structural invariants: non-empty, unique question ids, usable options.
    pub fn validate(&self) -> FormResult<()> {
        if self.id.trim().is_empty() {
            return Err(FormError::InvalidDefinition {
                form_id: self.id.clone(),
                reason: "form id is required".to_string(),
            });
        }
        if self.questions.is_empty() {
            return Err(FormError::EmptyForm {
                form_id: self.id.clone(),
            });
        }

        let mut seen = BTreeSet::new();
        for question in &self.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(FormError::InvalidDefinition {
                    form_id: self.id.clone(),
                    reason: format!("duplicate question id '{}'", question.id),
                });
            }
            question
                .kind
                .check_options()
                .map_err(|reason| FormError::InvalidDefinition {
                    form_id: self.id.clone(),
                    reason: format!("question '{}': {}", question.id, reason),
                })?;
        }
        Ok(())
    }
}

/// Question type tag as it appears in catalog files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    Textarea,
    Rating,
    MultipleChoice,
    Checkboxes,
    Dropdown,
}

impl QuestionType {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Textarea => "textarea",
            QuestionType::Rating => "rating",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Checkboxes => "checkboxes",
            QuestionType::Dropdown => "dropdown",
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(QuestionType::Text),
            "textarea" => Ok(QuestionType::Textarea),
            "rating" => Ok(QuestionType::Rating),
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "checkboxes" => Ok(QuestionType::Checkboxes),
            "dropdown" => Ok(QuestionType::Dropdown),
            _ => Err(format!("Unknown question type: {}", s)),
        }
    }
}

/// Question type together with the options that type needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    Text,
    Textarea,
    /// Integer scale from 1 to `max`.
    Rating { max: u32 },
    MultipleChoice { options: Vec<String> },
    Checkboxes { options: Vec<String> },
    Dropdown { options: Vec<String> },
}

impl QuestionKind {
    /// The type tag for this kind.
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::Text => QuestionType::Text,
            QuestionKind::Textarea => QuestionType::Textarea,
            QuestionKind::Rating { .. } => QuestionType::Rating,
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::Checkboxes { .. } => QuestionType::Checkboxes,
            QuestionKind::Dropdown { .. } => QuestionType::Dropdown,
        }
    }

    /// Option labels for choice-based kinds.
    pub fn options(&self) -> Option<&[String]> {
        match self {
            QuestionKind::MultipleChoice { options }
            | QuestionKind::Checkboxes { options }
            | QuestionKind::Dropdown { options } => Some(options),
            _ => None,
        }
    }

    fn check_options(&self) -> Result<(), String> {
        match self {
            QuestionKind::Rating { max } if *max == 0 => {
                Err("rating upper bound must be at least 1".to_string())
            }
            QuestionKind::MultipleChoice { options }
            | QuestionKind::Checkboxes { options }
            | QuestionKind::Dropdown { options }
                if options.is_empty() =>
            {
                Err("choice question needs at least one option".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// A single question or registration field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawQuestion", into = "RawQuestion")]
pub struct QuestionDefinition {
    /// Identifier, unique within the parent form.
    pub id: String,
    /// Prompt text.
    pub text: String,
    /// Type and options.
    pub kind: QuestionKind,
    /// Must be answered before the form can be submitted.
    pub required: bool,
    /// Input hint for the shell.
    pub placeholder: Option<String>,
}

impl QuestionDefinition {
    /// Create an optional question.
    pub fn new(id: impl Into<String>, text: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            kind,
            required: false,
            placeholder: None,
        }
    }

    /// Shorthand for a free-text question.
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, text, QuestionKind::Text)
    }

    /// Shorthand for a dropdown question.
    pub fn dropdown(id: impl Into<String>, text: impl Into<String>, options: &[&str]) -> Self {
        Self::new(
            id,
            text,
            QuestionKind::Dropdown {
                options: options.iter().map(|o| o.to_string()).collect(),
            },
        )
    }

    /// Mark the question as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the input placeholder.
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// The question's type tag.
    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    /// Check that an answer has the shape and values this question accepts.
    pub fn validate_answer(&self, answer: &Answer) -> FormResult<()> {
        let invalid = |reason: String| FormError::InvalidAnswer {
            question_id: self.id.clone(),
            reason,
        };

        match (&self.kind, answer) {
            (QuestionKind::Text | QuestionKind::Textarea, Answer::Text(_)) => Ok(()),
            (QuestionKind::Rating { max }, Answer::Number(n)) => {
                if (1..=*max).contains(n) {
                    Ok(())
                } else {
                    Err(invalid(format!("rating {} is outside 1..={}", n, max)))
                }
            }
            (
                QuestionKind::MultipleChoice { options } | QuestionKind::Dropdown { options },
                Answer::Text(choice),
            ) => {
                if options.iter().any(|o| o == choice) {
                    Ok(())
                } else {
                    Err(invalid(format!("'{}' is not one of the options", choice)))
                }
            }
            (QuestionKind::Checkboxes { options }, Answer::Selections(selected)) => {
                match selected.iter().find(|s| !options.contains(*s)) {
                    Some(unknown) => Err(invalid(format!("'{}' is not one of the options", unknown))),
                    None => Ok(()),
                }
            }
            (kind, answer) => Err(invalid(format!(
                "{} question cannot take a {} answer",
                kind.question_type(),
                answer.shape()
            ))),
        }
    }
}

// Catalog-file shape: `{"id", "text", "type", "options"?, "required"?, "placeholder"?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawQuestion {
    id: String,
    text: String,
    #[serde(rename = "type")]
    question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    placeholder: Option<String>,
}

impl TryFrom<RawQuestion> for QuestionDefinition {
    type Error = String;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        let labels = |options: Option<serde_json::Value>| -> Result<Vec<String>, String> {
            let value = options
                .ok_or_else(|| format!("question '{}' is missing its options", raw.id))?;
            serde_json::from_value(value)
                .map_err(|e| format!("question '{}' has invalid options: {}", raw.id, e))
        };

        let kind = match raw.question_type {
            QuestionType::Text => QuestionKind::Text,
            QuestionType::Textarea => QuestionKind::Textarea,
            QuestionType::Rating => {
                let max = raw
                    .options
                    .as_ref()
                    .and_then(|v| v.as_u64())
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| {
                        format!("rating question '{}' needs an integer upper bound", raw.id)
                    })?;
                QuestionKind::Rating { max }
            }
            QuestionType::MultipleChoice => QuestionKind::MultipleChoice {
                options: labels(raw.options)?,
            },
            QuestionType::Checkboxes => QuestionKind::Checkboxes {
                options: labels(raw.options)?,
            },
            QuestionType::Dropdown => QuestionKind::Dropdown {
                options: labels(raw.options)?,
            },
        };

        Ok(QuestionDefinition {
            id: raw.id,
            text: raw.text,
            kind,
            required: raw.required,
            placeholder: raw.placeholder,
        })
    }
}

impl From<QuestionDefinition> for RawQuestion {
    fn from(q: QuestionDefinition) -> Self {
        let question_type = q.kind.question_type();
        let options = match q.kind {
            QuestionKind::Text | QuestionKind::Textarea => None,
            QuestionKind::Rating { max } => Some(serde_json::Value::from(max)),
            QuestionKind::MultipleChoice { options }
            | QuestionKind::Checkboxes { options }
            | QuestionKind::Dropdown { options } => Some(serde_json::Value::from(options)),
        };
        RawQuestion {
            id: q.id,
            text: q.text,
            question_type,
            options,
            required: q.required,
            placeholder: q.placeholder,
        }
    }
}

/// An answer value. Which variant a question accepts depends on its type:
/// `Text` for text, textarea, multiple choice and dropdown; `Number` for
/// rating; `Selections` for checkboxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Number(u32),
    Text(String),
    Selections(BTreeSet<String>),
}

impl Answer {
    /// Build a text answer.
    pub fn text(value: impl Into<String>) -> Self {
        Answer::Text(value.into())
    }

    /// Build a checkbox answer from labels; duplicates collapse.
    pub fn selections<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Answer::Selections(values.into_iter().map(Into::into).collect())
    }

    /// Whether the answer carries no content (blank text or no selections).
    pub fn is_empty(&self) -> bool {
        match self {
            Answer::Number(_) => false,
            Answer::Text(s) => s.trim().is_empty(),
            Answer::Selections(set) => set.is_empty(),
        }
    }

    /// Scalar display value; `None` for multi-select answers.
    pub fn as_scalar(&self) -> Option<String> {
        match self {
            Answer::Number(n) => Some(n.to_string()),
            Answer::Text(s) => Some(s.clone()),
            Answer::Selections(_) => None,
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            Answer::Number(_) => "number",
            Answer::Text(_) => "text",
            Answer::Selections(_) => "selection",
        }
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Answer::Number(n) => write!(f, "{}", n),
            Answer::Text(s) => write!(f, "{}", s),
            Answer::Selections(set) => {
                let joined: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "{}", joined.join(", "))
            }
        }
    }
}

/// Answers of one traversal session, keyed by question id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<String, Answer>);

impl AnswerSet {
    /// Create an empty answer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the answer for a question.
    pub fn get(&self, question_id: &str) -> Option<&Answer> {
        self.0.get(question_id)
    }

    /// Set the answer for a question, returning the previous one.
    pub fn insert(&mut self, question_id: impl Into<String>, answer: Answer) -> Option<Answer> {
        self.0.insert(question_id.into(), answer)
    }

    /// Remove the answer for a question.
    pub fn remove(&mut self, question_id: &str) -> Option<Answer> {
        self.0.remove(question_id)
    }

    /// Whether the question has a non-empty answer.
    pub fn is_answered(&self, question_id: &str) -> bool {
        self.0.get(question_id).is_some_and(|a| !a.is_empty())
    }

    /// Number of answered questions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing has been answered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate answers in question-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Answer)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Answer)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (K, Answer)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
