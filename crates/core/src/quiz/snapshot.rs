use serde::{Deserialize, Serialize};

use crate::model::{AttemptId, OptionId, QuestionId};

use super::review::{OptionMark, option_marks};
use super::scoring;
use super::session::{QuizPhase, QuizSession};

/// One option as it should be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionView {
    pub id: OptionId,
    /// `A`, `B`, `C`, ... in option order.
    pub label: char,
    pub text: String,
    pub mark: OptionMark,
}

/// The question currently on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub index: usize,
    pub prompt: String,
    pub options: Vec<OptionView>,
    pub points: u32,
}

/// Read-only copy of an attempt, published after every state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSnapshot {
    pub attempt_id: AttemptId,
    pub phase: QuizPhase,
    pub total_questions: usize,
    pub current_index: usize,
    pub question: QuestionView,
    pub selected_answer: Option<String>,
    pub answers: Vec<Option<String>>,
    pub score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub passed: Option<bool>,
    pub time_remaining_seconds: u32,
    pub time_label: String,
    pub time_fraction_remaining: f32,
    pub progress_percent: u32,
    pub review_mode: bool,
    pub all_answered: bool,
    pub can_advance: bool,
    pub can_retreat: bool,
    pub can_submit: bool,
    pub can_review: bool,
}

impl QuizSnapshot {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == QuizPhase::Completed
    }
}

impl QuizSession {
    /// Build the snapshot handed to the presentation layer.
    #[must_use]
    pub fn snapshot(&self) -> QuizSnapshot {
        let shown = self.displayed_index();
        let question = &self.questions()[shown];
        let chosen = self.answers()[shown].as_deref();
        let marks = option_marks(question, chosen, self.review_mode());

        let options = question
            .options()
            .iter()
            .zip(marks)
            .zip(('A'..='Z').chain(std::iter::repeat('?')))
            .map(|((option, mark), label)| OptionView {
                id: option.id,
                label,
                text: option.text.clone(),
                mark,
            })
            .collect();

        let total = self.total_questions();
        let max_score = self.max_score();
        let complete = self.is_complete();

        QuizSnapshot {
            attempt_id: self.id(),
            phase: self.phase(),
            total_questions: total,
            current_index: self.current_index(),
            question: QuestionView {
                id: question.id(),
                index: shown,
                prompt: question.prompt().to_owned(),
                options,
                points: scoring::POINTS_PER_QUESTION,
            },
            selected_answer: self.selected_answer().map(str::to_owned),
            answers: self.answers().to_vec(),
            score: self.score(),
            max_score,
            percentage: scoring::percentage(self.score(), max_score),
            passed: self.passed(),
            time_remaining_seconds: self.time_remaining_seconds(),
            time_label: self.countdown().label(),
            time_fraction_remaining: self.countdown().fraction_remaining(),
            progress_percent: progress_percent(shown, total),
            review_mode: self.review_mode(),
            all_answered: self.all_answered(),
            can_advance: self.can_advance(),
            can_retreat: self.can_retreat(),
            can_submit: !complete,
            can_review: complete,
        }
    }
}

fn progress_percent(index: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let pct = (index + 1).saturating_mul(100) / total;
    u32::try_from(pct).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, Question};
    use crate::time::fixed_now;

    fn session() -> QuizSession {
        let questions = (1..=4)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    format!("Q{id}"),
                    vec![
                        AnswerOption::new(OptionId::new(10), "yes"),
                        AnswerOption::new(OptionId::new(20), "no"),
                    ],
                    "yes",
                )
                .unwrap()
            })
            .collect();
        QuizSession::start(questions, 90, fixed_now()).unwrap()
    }

    #[test]
    fn in_progress_snapshot_exposes_affordances() {
        let mut s = session();
        s.select_answer("no").unwrap();
        let snap = s.snapshot();

        assert_eq!(snap.phase, QuizPhase::InProgress);
        assert_eq!(snap.progress_percent, 25);
        assert_eq!(snap.time_label, "01:30");
        assert_eq!(snap.selected_answer.as_deref(), Some("no"));
        assert_eq!(snap.question.options[0].label, 'A');
        assert_eq!(snap.question.options[1].label, 'B');
        assert_eq!(snap.question.options[1].mark, OptionMark::Wrong);
        assert_eq!(snap.question.points, 10);
        assert!(snap.can_advance);
        assert!(!snap.can_retreat);
        assert!(snap.can_submit);
        assert!(!snap.can_review);
        assert!(!snap.all_answered);
        assert_eq!(snap.passed, None);
    }

    #[test]
    fn completed_snapshot_reports_result() {
        let mut s = session();
        for _ in 0..3 {
            s.select_answer("yes").unwrap();
            s.advance().unwrap();
        }
        s.submit(fixed_now()).unwrap();
        let snap = s.snapshot();

        assert!(snap.is_complete());
        assert_eq!(snap.score, 30);
        assert_eq!(snap.max_score, 40);
        assert_eq!(snap.percentage, 75);
        assert_eq!(snap.passed, Some(true));
        assert!(!snap.can_submit);
        assert!(!snap.can_advance);
        assert!(snap.can_review);
    }

    #[test]
    fn review_snapshot_follows_review_cursor() {
        let mut s = session();
        s.advance().unwrap();
        s.advance().unwrap();
        s.advance().unwrap();
        s.submit(fixed_now()).unwrap();
        s.toggle_review().unwrap();
        s.review_next().unwrap();

        let snap = s.snapshot();
        assert!(snap.review_mode);
        assert_eq!(snap.question.index, 1);
        assert_eq!(snap.current_index, 3);
        assert_eq!(snap.question.options[0].mark, OptionMark::Missed);
        assert_eq!(snap.question.options[1].mark, OptionMark::Neutral);
    }
}
