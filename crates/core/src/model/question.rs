use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("option id {0} appears more than once")]
    DuplicateOption(OptionId),
}

//
// ─── OPTION ────────────────────────────────────────────────────────────────────
//

/// One selectable answer of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: OptionId,
    pub text: String,
}

impl AnswerOption {
    #[must_use]
    pub fn new(id: OptionId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question, immutable once built.
///
/// The correct answer is the *text* of the authoritative option. Answers are
/// compared by exact text equality, so a correct answer that matches none of
/// the options simply makes the question unwinnable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<AnswerOption>,
    correct_answer: String,
}

impl Question {
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyPrompt` for a blank prompt and
    /// `QuestionError::DuplicateOption` when two options share an id.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<AnswerOption>,
        correct_answer: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }

        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if !seen.insert(option.id) {
                return Err(QuestionError::DuplicateOption(option.id));
            }
        }

        Ok(Self {
            id,
            prompt,
            options,
            correct_answer: correct_answer.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn option_by_id(&self, id: OptionId) -> Option<&AnswerOption> {
        self.options.iter().find(|option| option.id == id)
    }

    #[must_use]
    pub fn has_option_text(&self, text: &str) -> bool {
        self.options.iter().any(|option| option.text == text)
    }

    /// Whether `answer` earns the points for this question.
    #[must_use]
    pub fn is_correct(&self, answer: &str) -> bool {
        answer == self.correct_answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<AnswerOption> {
        vec![
            AnswerOption::new(OptionId::new(1), "RAM"),
            AnswerOption::new(OptionId::new(2), "CPU"),
        ]
    }

    #[test]
    fn builds_valid_question() {
        let q = Question::new(QuestionId::new(1), "Which one computes?", options(), "CPU").unwrap();
        assert!(q.is_correct("CPU"));
        assert!(!q.is_correct("cpu"));
        assert_eq!(q.option_by_id(OptionId::new(1)).unwrap().text, "RAM");
        assert!(q.has_option_text("RAM"));
        assert!(!q.has_option_text("GPU"));
    }

    #[test]
    fn rejects_blank_prompt() {
        let err = Question::new(QuestionId::new(1), "  ", options(), "CPU").unwrap_err();
        assert_eq!(err, QuestionError::EmptyPrompt);
    }

    #[test]
    fn rejects_duplicate_option_ids() {
        let dupes = vec![
            AnswerOption::new(OptionId::new(3), "a"),
            AnswerOption::new(OptionId::new(3), "b"),
        ];
        let err = Question::new(QuestionId::new(1), "Q", dupes, "a").unwrap_err();
        assert_eq!(err, QuestionError::DuplicateOption(OptionId::new(3)));
    }
}
