use std::sync::Arc;

use quiz_core::model::{Level, Topic};
use remote::{RemoteError, TopicCatalog};

/// Topic selection ahead of a quiz.
#[derive(Clone)]
pub struct TopicService {
    catalog: Arc<dyn TopicCatalog>,
}

impl TopicService {
    #[must_use]
    pub fn new(catalog: Arc<dyn TopicCatalog>) -> Self {
        Self { catalog }
    }

    /// All topics, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the catalog cannot be loaded.
    pub async fn list(&self) -> Result<Vec<Topic>, RemoteError> {
        let mut topics = self.catalog.list_topics().await?;
        topics.sort_by_key(Topic::id);
        tracing::debug!(count = topics.len(), "topics loaded");
        Ok(topics)
    }

    /// The levels every topic is offered at, easiest first.
    #[must_use]
    pub fn levels(&self) -> &'static [Level] {
        &Level::ALL
    }
}
