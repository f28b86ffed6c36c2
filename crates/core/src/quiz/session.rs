use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::{AttemptId, AttemptReport, CompletionCause, OptionId, Question};

use super::countdown::Countdown;
use super::scoring;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Reasons an attempt cannot be started.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("no questions available for this quiz")]
    NoQuestions,

    #[error("quiz duration must be > 0 seconds")]
    InvalidDuration,
}

/// An operation was invoked outside of its precondition.
///
/// The session is left untouched whenever one of these is returned.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransitionError {
    #[error("attempt already completed")]
    Completed,

    #[error("attempt has not been completed yet")]
    NotCompleted,

    #[error("already at the last question")]
    AtLastQuestion,

    #[error("already at the first question")]
    AtFirstQuestion,

    #[error("answer is not an option of the current question")]
    UnknownOption,

    #[error("review mode is not active")]
    ReviewInactive,
}

//
// ─── PHASE & STEP OUTCOMES ─────────────────────────────────────────────────────
//

/// Top-level lifecycle of an attempt.
///
/// A `QuizSession` only ever reports `InProgress` or `Completed`; `Loading`
/// is used by callers while questions are still being fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizPhase {
    Loading,
    InProgress,
    Completed,
}

/// Outcome of `skip`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Advanced,
    Finished(AttemptReport),
}

/// Outcome of a countdown tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Running { remaining: u32 },
    Expired(AttemptReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Completion {
    cause: CompletionCause,
    at: DateTime<Utc>,
    passed: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State of one quiz attempt.
///
/// Steps through a fixed list of questions, records one answer slot per
/// question and keeps `score` equal to the points of the recorded answers
/// after every mutation. Completion is one-way; afterwards the answers are
/// frozen and only review navigation is accepted.
pub struct QuizSession {
    id: AttemptId,
    questions: Vec<Question>,
    current: usize,
    answers: Vec<Option<String>>,
    score: u32,
    countdown: Countdown,
    review_mode: bool,
    review_cursor: usize,
    started_at: DateTime<Utc>,
    completion: Option<Completion>,
}

impl QuizSession {
    /// Begin an attempt over `questions` with `total_seconds` on the clock.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` if `questions` is empty and
    /// `QuizError::InvalidDuration` if `total_seconds` is zero.
    pub fn start(
        questions: Vec<Question>,
        total_seconds: u32,
        started_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        let countdown = Countdown::new(total_seconds).ok_or(QuizError::InvalidDuration)?;
        let answers = vec![None; questions.len()];

        Ok(Self {
            id: AttemptId::random(),
            questions,
            current: 0,
            answers,
            score: 0,
            countdown,
            review_mode: false,
            review_cursor: 0,
            started_at,
            completion: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<String>] {
        &self.answers
    }

    /// The answer highlighted for the current question.
    #[must_use]
    pub fn selected_answer(&self) -> Option<&str> {
        self.answers[self.current].as_deref()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn max_score(&self) -> u32 {
        scoring::max_score(self.questions.len())
    }

    /// `None` until the attempt is completed.
    #[must_use]
    pub fn passed(&self) -> Option<bool> {
        self.completion.map(|c| c.passed)
    }

    #[must_use]
    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    #[must_use]
    pub fn time_remaining_seconds(&self) -> u32 {
        self.countdown.remaining()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completion.is_some()
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        if self.is_complete() {
            QuizPhase::Completed
        } else {
            QuizPhase::InProgress
        }
    }

    #[must_use]
    pub fn completion_cause(&self) -> Option<CompletionCause> {
        self.completion.map(|c| c.cause)
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completion.map(|c| c.at)
    }

    #[must_use]
    pub fn review_mode(&self) -> bool {
        self.review_mode
    }

    #[must_use]
    pub fn review_index(&self) -> usize {
        self.review_cursor
    }

    /// The question being displayed: the review cursor in review mode,
    /// otherwise the current question.
    #[must_use]
    pub fn displayed_index(&self) -> usize {
        if self.review_mode {
            self.review_cursor
        } else {
            self.current
        }
    }

    #[must_use]
    pub fn all_answered(&self) -> bool {
        self.answers.iter().all(Option::is_some)
    }

    #[must_use]
    pub fn can_advance(&self) -> bool {
        !self.is_complete() && self.current + 1 < self.questions.len()
    }

    #[must_use]
    pub fn can_retreat(&self) -> bool {
        !self.is_complete() && self.current > 0
    }

    /// The payload for the result reporter, once completed.
    #[must_use]
    pub fn report(&self) -> Option<AttemptReport> {
        self.completion.map(|c| AttemptReport {
            score: self.score,
            passed: c.passed,
            answers: self.answers.clone(),
        })
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    /// Record `answer` for the current question.
    ///
    /// Re-selection always overwrites the previous choice.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::Completed` after completion and
    /// `TransitionError::UnknownOption` if `answer` is not an option text of
    /// the current question.
    pub fn select_answer(&mut self, answer: &str) -> Result<(), TransitionError> {
        self.ensure_in_progress()?;
        if !self.current_question().has_option_text(answer) {
            return Err(TransitionError::UnknownOption);
        }
        if self.selected_answer() == Some(answer) {
            return Ok(());
        }
        self.answers[self.current] = Some(answer.to_owned());
        self.rescore();
        Ok(())
    }

    /// Select the option with `option_id` on the current question.
    ///
    /// # Errors
    ///
    /// Same as [`QuizSession::select_answer`].
    pub fn select_option(&mut self, option_id: OptionId) -> Result<(), TransitionError> {
        self.ensure_in_progress()?;
        let text = self
            .current_question()
            .option_by_id(option_id)
            .map(|option| option.text.clone())
            .ok_or(TransitionError::UnknownOption)?;
        self.select_answer(&text)
    }

    /// # Errors
    ///
    /// Returns `TransitionError::Completed` or `TransitionError::AtLastQuestion`.
    pub fn advance(&mut self) -> Result<(), TransitionError> {
        self.ensure_in_progress()?;
        if self.current + 1 >= self.questions.len() {
            return Err(TransitionError::AtLastQuestion);
        }
        self.current += 1;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `TransitionError::Completed` or `TransitionError::AtFirstQuestion`.
    pub fn retreat(&mut self) -> Result<(), TransitionError> {
        self.ensure_in_progress()?;
        if self.current == 0 {
            return Err(TransitionError::AtFirstQuestion);
        }
        self.current -= 1;
        Ok(())
    }

    /// Clear the current answer, then advance, or submit on the last question.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::Completed` after completion.
    pub fn skip(&mut self, now: DateTime<Utc>) -> Result<Step, TransitionError> {
        self.ensure_in_progress()?;
        self.answers[self.current] = None;
        self.rescore();

        if self.current + 1 < self.questions.len() {
            self.current += 1;
            Ok(Step::Advanced)
        } else {
            Ok(Step::Finished(self.finish(CompletionCause::Skipped, now)))
        }
    }

    /// Complete the attempt. Unanswered questions count as wrong.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::Completed` if the attempt was already
    /// completed; nothing is recomputed in that case.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<AttemptReport, TransitionError> {
        self.ensure_in_progress()?;
        Ok(self.finish(CompletionCause::Manual, now))
    }

    /// Consume one second; completes the attempt when the time runs out.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::Completed` for ticks after completion; the
    /// countdown is not touched.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<Tick, TransitionError> {
        self.ensure_in_progress()?;
        let remaining = self.countdown.tick();
        if remaining == 0 {
            return Ok(Tick::Expired(self.finish(CompletionCause::TimeExpired, now)));
        }
        Ok(Tick::Running { remaining })
    }

    /// Flip review mode and return the new value.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::NotCompleted` before completion.
    pub fn toggle_review(&mut self) -> Result<bool, TransitionError> {
        if !self.is_complete() {
            return Err(TransitionError::NotCompleted);
        }
        self.review_mode = !self.review_mode;
        if self.review_mode {
            self.review_cursor = 0;
        }
        Ok(self.review_mode)
    }

    /// # Errors
    ///
    /// Returns `TransitionError::ReviewInactive` outside review mode and
    /// `TransitionError::AtLastQuestion` at the end.
    pub fn review_next(&mut self) -> Result<(), TransitionError> {
        if !self.review_mode {
            return Err(TransitionError::ReviewInactive);
        }
        if self.review_cursor + 1 >= self.questions.len() {
            return Err(TransitionError::AtLastQuestion);
        }
        self.review_cursor += 1;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `TransitionError::ReviewInactive` outside review mode and
    /// `TransitionError::AtFirstQuestion` at the start.
    pub fn review_previous(&mut self) -> Result<(), TransitionError> {
        if !self.review_mode {
            return Err(TransitionError::ReviewInactive);
        }
        if self.review_cursor == 0 {
            return Err(TransitionError::AtFirstQuestion);
        }
        self.review_cursor -= 1;
        Ok(())
    }

    fn ensure_in_progress(&self) -> Result<(), TransitionError> {
        if self.is_complete() {
            return Err(TransitionError::Completed);
        }
        Ok(())
    }

    fn rescore(&mut self) {
        self.score = scoring::score(&self.questions, &self.answers);
    }

    fn finish(&mut self, cause: CompletionCause, at: DateTime<Utc>) -> AttemptReport {
        self.rescore();
        let passed = scoring::is_passing(self.score, self.max_score());
        self.completion = Some(Completion { cause, at, passed });
        AttemptReport {
            score: self.score,
            passed,
            answers: self.answers.clone(),
        }
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("id", &self.id)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("score", &self.score)
            .field("remaining", &self.countdown.remaining())
            .field("completion", &self.completion)
            .field("review_mode", &self.review_mode)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, QuestionId};
    use crate::time::fixed_now;

    const LETTERS: [&str; 4] = ["A", "B", "C", "D"];

    fn question(id: u64, correct: &str) -> Question {
        let options = LETTERS
            .iter()
            .zip(1..)
            .map(|(text, oid)| AnswerOption::new(OptionId::new(oid), *text))
            .collect();
        Question::new(QuestionId::new(id), format!("Question {id}"), options, correct).unwrap()
    }

    fn quiz(n: u64) -> Vec<Question> {
        (1..=n).map(|id| question(id, "A")).collect()
    }

    fn start(n: u64, seconds: u32) -> QuizSession {
        QuizSession::start(quiz(n), seconds, fixed_now()).unwrap()
    }

    fn expected_score(session: &QuizSession) -> u32 {
        session
            .questions()
            .iter()
            .zip(session.answers())
            .filter(|(q, a)| a.as_deref() == Some(q.correct_answer()))
            .count() as u32
            * 10
    }

    #[test]
    fn start_initializes_state() {
        let session = start(3, 600);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.answers(), &[None, None, None]);
        assert_eq!(session.score(), 0);
        assert_eq!(session.time_remaining_seconds(), 600);
        assert_eq!(session.phase(), QuizPhase::InProgress);
        assert_eq!(session.passed(), None);
        assert!(!session.review_mode());
    }

    #[test]
    fn empty_quiz_is_rejected() {
        let err = QuizSession::start(Vec::new(), 600, fixed_now()).unwrap_err();
        assert_eq!(err, QuizError::NoQuestions);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let err = QuizSession::start(quiz(1), 0, fixed_now()).unwrap_err();
        assert_eq!(err, QuizError::InvalidDuration);
    }

    #[test]
    fn score_stays_consistent_after_every_selection() {
        let mut session = start(4, 600);
        let script = [
            (0, "A"),
            (0, "B"),
            (1, "A"),
            (2, "C"),
            (2, "A"),
            (3, "A"),
            (0, "A"),
            (3, "D"),
        ];
        for (index, answer) in script {
            while session.current_index() < index {
                session.advance().unwrap();
            }
            while session.current_index() > index {
                session.retreat().unwrap();
            }
            session.select_answer(answer).unwrap();
            assert_eq!(session.score(), expected_score(&session));
        }
        assert_eq!(session.score(), 30);
    }

    #[test]
    fn reselection_overwrites_and_is_idempotent() {
        let mut session = start(1, 600);
        session.select_answer("B").unwrap();
        session.select_answer("B").unwrap();
        assert_eq!(session.selected_answer(), Some("B"));
        session.select_answer("A").unwrap();
        assert_eq!(session.selected_answer(), Some("A"));
        assert_eq!(session.score(), 10);
    }

    #[test]
    fn unknown_answer_is_rejected_without_mutation() {
        let mut session = start(1, 600);
        session.select_answer("A").unwrap();
        let err = session.select_answer("Z").unwrap_err();
        assert_eq!(err, TransitionError::UnknownOption);
        assert_eq!(session.selected_answer(), Some("A"));
    }

    #[test]
    fn select_option_resolves_text() {
        let mut session = start(1, 600);
        session.select_option(OptionId::new(2)).unwrap();
        assert_eq!(session.selected_answer(), Some("B"));
        let err = session.select_option(OptionId::new(99)).unwrap_err();
        assert_eq!(err, TransitionError::UnknownOption);
    }

    #[test]
    fn navigation_preserves_answers() {
        let mut session = start(2, 600);
        session.select_answer("B").unwrap();
        session.advance().unwrap();
        assert_eq!(session.selected_answer(), None);
        session.retreat().unwrap();
        assert_eq!(session.selected_answer(), Some("B"));
    }

    #[test]
    fn navigation_is_bounded() {
        let mut session = start(2, 600);
        assert_eq!(session.retreat(), Err(TransitionError::AtFirstQuestion));
        session.advance().unwrap();
        assert_eq!(session.advance(), Err(TransitionError::AtLastQuestion));
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn skip_clears_answer_then_advances() {
        let mut session = start(3, 600);
        session.select_answer("A").unwrap();
        assert_eq!(session.score(), 10);
        assert_eq!(session.skip(fixed_now()), Ok(Step::Advanced));
        assert_eq!(session.answers()[0], None);
        assert_eq!(session.score(), 0);
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn skip_on_last_question_submits() {
        let mut session = start(1, 600);
        session.select_answer("A").unwrap();
        let step = session.skip(fixed_now()).unwrap();
        assert_eq!(
            step,
            Step::Finished(AttemptReport {
                score: 0,
                passed: false,
                answers: vec![None],
            })
        );
        assert_eq!(session.completion_cause(), Some(CompletionCause::Skipped));
    }

    #[test]
    fn seven_of_ten_passes() {
        let mut session = start(10, 600);
        for i in 0..10 {
            session.select_answer(if i < 7 { "A" } else { "B" }).unwrap();
            if i < 9 {
                session.advance().unwrap();
            }
        }
        let report = session.submit(fixed_now()).unwrap();
        assert_eq!(report.score, 70);
        assert!(report.passed);
        assert_eq!(session.passed(), Some(true));
    }

    #[test]
    fn six_of_ten_fails() {
        let mut session = start(10, 600);
        for i in 0..10 {
            session.select_answer(if i < 6 { "A" } else { "C" }).unwrap();
            if i < 9 {
                session.advance().unwrap();
            }
        }
        let report = session.submit(fixed_now()).unwrap();
        assert_eq!(report.score, 60);
        assert!(!report.passed);
    }

    #[test]
    fn second_submit_is_rejected_and_state_is_unchanged() {
        let mut session = start(2, 600);
        session.select_answer("A").unwrap();
        let first = session.submit(fixed_now()).unwrap();
        let err = session.submit(fixed_now()).unwrap_err();
        assert_eq!(err, TransitionError::Completed);
        assert_eq!(session.report(), Some(first));
    }

    #[test]
    fn answers_are_frozen_after_completion() {
        let mut session = start(2, 600);
        session.submit(fixed_now()).unwrap();
        assert_eq!(session.select_answer("A"), Err(TransitionError::Completed));
        assert_eq!(session.advance(), Err(TransitionError::Completed));
        assert_eq!(session.retreat(), Err(TransitionError::Completed));
        assert_eq!(session.skip(fixed_now()), Err(TransitionError::Completed));
        assert_eq!(session.answers(), &[None, None]);
    }

    #[test]
    fn countdown_expiry_completes_once() {
        let mut session = start(2, 5);
        session.select_answer("A").unwrap();
        for expected in (1..5).rev() {
            assert_eq!(
                session.tick(fixed_now()),
                Ok(Tick::Running {
                    remaining: expected
                })
            );
        }
        let tick = session.tick(fixed_now()).unwrap();
        assert!(matches!(tick, Tick::Expired(ref r) if r.score == 10 && !r.passed));
        assert!(session.is_complete());
        assert_eq!(session.completion_cause(), Some(CompletionCause::TimeExpired));
        assert_eq!(session.time_remaining_seconds(), 0);
        assert_eq!(session.tick(fixed_now()), Err(TransitionError::Completed));
    }

    #[test]
    fn ticks_after_manual_submit_leave_countdown_alone() {
        let mut session = start(1, 5);
        session.tick(fixed_now()).unwrap();
        session.submit(fixed_now()).unwrap();
        assert!(session.tick(fixed_now()).is_err());
        assert_eq!(session.time_remaining_seconds(), 4);
    }

    #[test]
    fn review_requires_completion() {
        let mut session = start(2, 600);
        assert_eq!(session.toggle_review(), Err(TransitionError::NotCompleted));
        assert!(!session.review_mode());

        session.submit(fixed_now()).unwrap();
        assert_eq!(session.toggle_review(), Ok(true));
        assert_eq!(session.toggle_review(), Ok(false));
    }

    #[test]
    fn review_navigation_walks_all_questions() {
        let mut session = start(3, 600);
        session.advance().unwrap();
        session.advance().unwrap();
        session.select_answer("B").unwrap();
        session.submit(fixed_now()).unwrap();

        assert_eq!(session.review_next(), Err(TransitionError::ReviewInactive));
        session.toggle_review().unwrap();
        assert_eq!(session.displayed_index(), 0);
        session.review_next().unwrap();
        session.review_next().unwrap();
        assert_eq!(session.review_next(), Err(TransitionError::AtLastQuestion));
        assert_eq!(session.displayed_index(), 2);
        session.review_previous().unwrap();
        assert_eq!(session.review_index(), 1);
        assert_eq!(session.answers()[2].as_deref(), Some("B"));
    }

    #[test]
    fn completion_timestamp_comes_from_caller() {
        let mut session = start(1, 600);
        let later = fixed_now() + chrono::Duration::seconds(42);
        session.submit(later).unwrap();
        assert_eq!(session.started_at(), fixed_now());
        assert_eq!(session.completed_at(), Some(later));
    }
}
