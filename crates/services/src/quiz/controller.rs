use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::Clock;
use quiz_core::model::{AttemptReport, OptionId, Question};
use quiz_core::quiz::{QuizError, QuizSession, QuizSnapshot, Step, Tick, TransitionError};
use remote::ResultReporter;
use tokio::task::JoinHandle;

use super::events::QuizEvent;
use super::timer::{TickSink, Timer, TimerHandle};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Runs one quiz attempt: the session state plus its side effects.
///
/// Owns the countdown timer while the attempt is in progress and hands the
/// final result to the reporter exactly once. Every path that leaves the
/// in-progress phase (submit, skip past the end, time running out,
/// teardown, drop) cancels the timer.
pub struct QuizController {
    session: QuizSession,
    clock: Clock,
    reporter: Arc<dyn ResultReporter>,
    timer: Option<TimerHandle>,
    pending_report: Option<JoinHandle<()>>,
}

impl QuizController {
    /// Start an attempt and its one-second countdown.
    ///
    /// Must be called from within a Tokio runtime, since completion spawns
    /// the result report.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` for an empty question list and
    /// `QuizError::InvalidDuration` for a zero duration. No timer is started
    /// in either case.
    pub fn start(
        questions: Vec<Question>,
        total_seconds: u32,
        clock: Clock,
        reporter: Arc<dyn ResultReporter>,
        timer: &dyn Timer,
        ticks: TickSink,
    ) -> Result<Self, QuizError> {
        let session = QuizSession::start(questions, total_seconds, clock.now())?;
        tracing::info!(
            attempt = %session.id(),
            questions = session.total_questions(),
            total_seconds,
            "quiz attempt started"
        );
        let handle = timer.start(TICK_PERIOD, ticks);

        Ok(Self {
            session,
            clock,
            reporter,
            timer: Some(handle),
            pending_report: None,
        })
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn snapshot(&self) -> QuizSnapshot {
        self.session.snapshot()
    }

    #[must_use]
    pub fn is_timer_running(&self) -> bool {
        self.timer.is_some()
    }

    //
    // ─── INTENTS ───────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `TransitionError` if the attempt is completed or `answer` is
    /// not an option of the current question.
    pub fn select_answer(&mut self, answer: &str) -> Result<(), TransitionError> {
        self.session.select_answer(answer)
    }

    /// # Errors
    ///
    /// Returns `TransitionError` if the attempt is completed or the option
    /// does not belong to the current question.
    pub fn select_option(&mut self, option_id: OptionId) -> Result<(), TransitionError> {
        self.session.select_option(option_id)
    }

    /// # Errors
    ///
    /// Returns `TransitionError` when completed or on the last question.
    pub fn advance(&mut self) -> Result<(), TransitionError> {
        self.session.advance()
    }

    /// # Errors
    ///
    /// Returns `TransitionError` when completed or on the first question.
    pub fn retreat(&mut self) -> Result<(), TransitionError> {
        self.session.retreat()
    }

    /// Clear the current answer and move on; on the last question this
    /// completes the attempt.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::Completed` after completion.
    pub fn skip(&mut self) -> Result<Step, TransitionError> {
        let step = self.session.skip(self.clock.now())?;
        if let Step::Finished(report) = &step {
            self.finish(report.clone());
        }
        Ok(step)
    }

    /// Complete the attempt and report it.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::Completed` on any call after the first
    /// completion; nothing is reported again.
    pub fn submit(&mut self) -> Result<AttemptReport, TransitionError> {
        let report = self.session.submit(self.clock.now())?;
        self.finish(report.clone());
        Ok(report)
    }

    /// Apply one countdown tick. Reaching zero submits the attempt.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::Completed` for ticks that arrive after
    /// completion.
    pub fn on_timer_tick(&mut self) -> Result<Tick, TransitionError> {
        let tick = self.session.tick(self.clock.now())?;
        if let Tick::Expired(report) = &tick {
            tracing::info!(attempt = %self.session.id(), "quiz time expired");
            self.finish(report.clone());
        }
        Ok(tick)
    }

    /// # Errors
    ///
    /// Returns `TransitionError::NotCompleted` before completion.
    pub fn toggle_review(&mut self) -> Result<bool, TransitionError> {
        self.session.toggle_review()
    }

    /// # Errors
    ///
    /// Returns `TransitionError` outside review mode or at the last question.
    pub fn review_next(&mut self) -> Result<(), TransitionError> {
        self.session.review_next()
    }

    /// # Errors
    ///
    /// Returns `TransitionError` outside review mode or at the first question.
    pub fn review_previous(&mut self) -> Result<(), TransitionError> {
        self.session.review_previous()
    }

    /// Stop the countdown without completing the attempt.
    pub fn teardown(&mut self) {
        if self.timer.is_some() {
            tracing::debug!(attempt = %self.session.id(), "quiz torn down");
        }
        self.stop_timer();
    }

    /// Apply a queued event, absorbing invalid transitions.
    ///
    /// Returns `true` when the event changed something worth republishing.
    pub fn handle(&mut self, event: QuizEvent) -> bool {
        let name = event.name();
        let outcome = match event {
            QuizEvent::Select(answer) => self.select_answer(&answer),
            QuizEvent::SelectOption(option_id) => self.select_option(option_id),
            QuizEvent::Advance => self.advance(),
            QuizEvent::Retreat => self.retreat(),
            QuizEvent::Skip => self.skip().map(drop),
            QuizEvent::Submit => self.submit().map(drop),
            QuizEvent::Tick => self.on_timer_tick().map(drop),
            QuizEvent::ToggleReview => self.toggle_review().map(drop),
            QuizEvent::ReviewNext => self.review_next(),
            QuizEvent::ReviewPrevious => self.review_previous(),
            QuizEvent::Teardown => {
                self.teardown();
                Ok(())
            }
        };

        match outcome {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(attempt = %self.session.id(), event = name, %err, "quiz event ignored");
                false
            }
        }
    }

    /// Wait for an in-flight result report to finish.
    pub async fn flush_report(&mut self) {
        if let Some(task) = self.pending_report.take() {
            if let Err(err) = task.await {
                tracing::warn!(attempt = %self.session.id(), %err, "result report task failed");
            }
        }
    }

    fn finish(&mut self, report: AttemptReport) {
        self.stop_timer();
        tracing::info!(
            attempt = %self.session.id(),
            score = report.score,
            passed = report.passed,
            cause = ?self.session.completion_cause(),
            "quiz attempt completed"
        );

        let reporter = Arc::clone(&self.reporter);
        let attempt = self.session.id();
        self.pending_report = Some(tokio::spawn(async move {
            match reporter.report(&report).await {
                Ok(()) => tracing::debug!(%attempt, "quiz result reported"),
                Err(err) => tracing::warn!(%attempt, %err, "failed to report quiz result"),
            }
        }));
    }

    fn stop_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.cancel();
        }
    }
}

impl Drop for QuizController {
    fn drop(&mut self) {
        self.stop_timer();
    }
}

impl fmt::Debug for QuizController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizController")
            .field("session", &self.session)
            .field("timer_running", &self.timer.is_some())
            .field("report_pending", &self.pending_report.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::timer::ManualTimer;
    use quiz_core::model::{AnswerOption, QuestionId};
    use quiz_core::quiz::QuizPhase;
    use quiz_core::time::fixed_clock;
    use remote::InMemoryBackend;
    use tokio::sync::mpsc;

    fn question(id: u64) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            vec![
                AnswerOption::new(OptionId::new(id * 10 + 1), "right"),
                AnswerOption::new(OptionId::new(id * 10 + 2), "wrong"),
            ],
            "right",
        )
        .unwrap()
    }

    struct Fixture {
        controller: QuizController,
        timer: ManualTimer,
        backend: InMemoryBackend,
        _events: mpsc::Sender<QuizEvent>,
    }

    fn start(count: u64, total_seconds: u32) -> Fixture {
        let timer = ManualTimer::new();
        let backend = InMemoryBackend::new();
        let (events, _rx) = mpsc::channel(8);
        let controller = QuizController::start(
            (1..=count).map(question).collect(),
            total_seconds,
            fixed_clock(),
            Arc::new(backend.clone()),
            &timer,
            events.downgrade(),
        )
        .unwrap();
        Fixture {
            controller,
            timer,
            backend,
            _events: events,
        }
    }

    #[tokio::test]
    async fn start_runs_timer_and_rejects_bad_input() {
        let fx = start(2, 60);
        assert_eq!(fx.timer.starts(), 1);
        assert!(fx.controller.is_timer_running());

        let timer = ManualTimer::new();
        let (events, _rx) = mpsc::channel(1);
        let err = QuizController::start(
            Vec::new(),
            60,
            fixed_clock(),
            Arc::new(InMemoryBackend::new()),
            &timer,
            events.downgrade(),
        )
        .unwrap_err();
        assert_eq!(err, QuizError::NoQuestions);
        assert_eq!(timer.starts(), 0);
    }

    #[tokio::test]
    async fn submit_reports_once_and_cancels_timer_once() {
        let mut fx = start(2, 60);
        fx.controller.select_answer("right").unwrap();

        let report = fx.controller.submit().unwrap();
        assert_eq!(report.score, 10);
        assert!(fx.controller.submit().is_err());
        assert!(fx.controller.on_timer_tick().is_err());
        fx.controller.teardown();
        fx.controller.flush_report().await;

        assert_eq!(fx.timer.cancels(), 1);
        assert_eq!(fx.backend.reports().unwrap(), vec![report]);
    }

    #[tokio::test]
    async fn five_ticks_on_five_seconds_auto_submit() {
        let mut fx = start(3, 5);
        for _ in 0..4 {
            assert!(matches!(
                fx.controller.on_timer_tick().unwrap(),
                Tick::Running { .. }
            ));
        }
        assert!(matches!(
            fx.controller.on_timer_tick().unwrap(),
            Tick::Expired(_)
        ));
        fx.controller.flush_report().await;

        assert_eq!(fx.controller.session().phase(), QuizPhase::Completed);
        assert_eq!(fx.controller.session().time_remaining_seconds(), 0);
        assert_eq!(fx.timer.cancels(), 1);
        assert_eq!(fx.backend.reports().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn skip_on_last_question_submits() {
        let mut fx = start(1, 60);
        fx.controller.select_answer("right").unwrap();
        let step = fx.controller.skip().unwrap();
        fx.controller.flush_report().await;

        let Step::Finished(report) = step else {
            panic!("expected the attempt to finish");
        };
        assert_eq!(report.answers, vec![None]);
        assert_eq!(report.score, 0);
        assert_eq!(fx.timer.cancels(), 1);
    }

    #[tokio::test]
    async fn reporter_failure_keeps_local_result() {
        let mut fx = start(1, 60);
        fx.backend.fail_reports(true).unwrap();
        fx.controller.select_answer("right").unwrap();
        fx.controller.submit().unwrap();
        fx.controller.flush_report().await;

        assert!(fx.controller.session().is_complete());
        assert_eq!(fx.controller.session().score(), 10);
        assert_eq!(fx.controller.session().passed(), Some(true));
        assert!(fx.backend.reports().unwrap().is_empty());
    }

    #[tokio::test]
    async fn handle_absorbs_invalid_events() {
        let mut fx = start(2, 60);
        assert!(!fx.controller.handle(QuizEvent::Retreat));
        assert!(!fx.controller.handle(QuizEvent::ToggleReview));
        assert!(!fx.controller.handle(QuizEvent::Select("maybe".into())));
        assert!(fx.controller.handle(QuizEvent::Select("wrong".into())));
        assert!(fx.controller.handle(QuizEvent::Advance));
        assert_eq!(fx.controller.session().current_index(), 1);
        assert_eq!(fx.controller.session().answers()[0].as_deref(), Some("wrong"));
    }

    #[tokio::test]
    async fn teardown_and_drop_cancel_exactly_once() {
        let mut fx = start(2, 60);
        fx.controller.teardown();
        fx.controller.teardown();
        assert_eq!(fx.timer.cancels(), 1);

        let fx = start(2, 60);
        let timer = fx.timer.clone();
        drop(fx);
        assert_eq!(timer.cancels(), 1);
    }
}
