use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{Level, Question, TopicId};
use remote::{Backend, QuestionSource, ResultReporter};

use crate::error::LoadError;

use super::controller::QuizController;
use super::timer::{TickSink, Timer};

/// Fetches the questions of a quiz and starts an attempt over them.
#[derive(Clone)]
pub struct QuizLoader {
    clock: Clock,
    questions: Arc<dyn QuestionSource>,
    reporter: Arc<dyn ResultReporter>,
}

impl QuizLoader {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionSource>,
        reporter: Arc<dyn ResultReporter>,
    ) -> Self {
        Self {
            clock,
            questions,
            reporter,
        }
    }

    #[must_use]
    pub fn from_backend(clock: Clock, backend: &Backend) -> Self {
        Self::new(
            clock,
            Arc::clone(&backend.questions),
            Arc::clone(&backend.reporter),
        )
    }

    /// Fetch the questions for `topic` at `level`.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Source` when the source fails and
    /// `LoadError::NoQuestions` when it returns an empty list.
    pub async fn load(&self, topic: TopicId, level: Level) -> Result<Vec<Question>, LoadError> {
        let questions = self.questions.fetch_questions(topic, level).await?;
        if questions.is_empty() {
            tracing::info!(%topic, %level, "quiz has no questions");
            return Err(LoadError::NoQuestions);
        }
        Ok(questions)
    }

    /// Load the questions and start a controller with `total_seconds` on
    /// the clock.
    ///
    /// # Errors
    ///
    /// Returns any `LoadError` from [`QuizLoader::load`], or
    /// `LoadError::InvalidDuration` when `total_seconds` is zero.
    pub async fn start(
        &self,
        topic: TopicId,
        level: Level,
        total_seconds: u32,
        timer: &dyn Timer,
        ticks: TickSink,
    ) -> Result<QuizController, LoadError> {
        if total_seconds == 0 {
            return Err(LoadError::InvalidDuration);
        }
        let questions = self.load(topic, level).await?;
        let controller = QuizController::start(
            questions,
            total_seconds,
            self.clock,
            Arc::clone(&self.reporter),
            timer,
            ticks,
        )?;
        Ok(controller)
    }
}
