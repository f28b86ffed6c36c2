//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::quiz::QuizError;
use remote::RemoteError;

/// Errors emitted while loading questions and starting an attempt.
///
/// All of them are terminal for the attempt that was being started.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("failed to load questions: {0}")]
    Source(#[from] RemoteError),
    #[error("no questions available for this quiz")]
    NoQuestions,
    #[error("quiz duration must be > 0 seconds")]
    InvalidDuration,
}

impl From<QuizError> for LoadError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::InvalidDuration => Self::InvalidDuration,
            _ => Self::NoQuestions,
        }
    }
}

/// Errors from account operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("`{0}` is not an email address")]
    InvalidEmail(String),
    #[error("the backend rejected the credentials or account details")]
    Rejected,
    #[error(transparent)]
    Remote(RemoteError),
}

impl From<RemoteError> for AuthError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Rejected => Self::Rejected,
            other => Self::Remote(other),
        }
    }
}
