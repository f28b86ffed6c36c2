use serde::{Deserialize, Serialize};

/// Why an attempt left the in-progress state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionCause {
    /// The learner pressed submit.
    Manual,
    /// The learner skipped past the last question.
    Skipped,
    /// The countdown reached zero.
    TimeExpired,
}

/// Final result of an attempt as handed to the result reporter.
///
/// Serializes as `{"score": int, "passed": bool, "answers": [text|null]}`;
/// the backend's results endpoint expects exactly this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptReport {
    pub score: u32,
    pub passed: bool,
    pub answers: Vec<Option<String>>,
}
