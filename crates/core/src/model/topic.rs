use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::TopicId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic name cannot be empty")]
    EmptyName,
}

/// A subject area learners can pick a quiz from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    id: TopicId,
    name: String,
}

impl Topic {
    /// # Errors
    ///
    /// Returns `TopicError::EmptyName` if the trimmed name is empty.
    pub fn new(id: TopicId, name: impl Into<String>) -> Result<Self, TopicError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(TopicError::EmptyName);
        }
        Ok(Self { id, name })
    }

    #[must_use]
    pub fn id(&self) -> TopicId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
