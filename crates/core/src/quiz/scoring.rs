use crate::model::Question;

/// Points awarded for each correctly answered question.
pub const POINTS_PER_QUESTION: u32 = 10;

/// Minimum share of the maximum score, in percent, needed to pass.
pub const PASS_PERCENT: u32 = 70;

/// Sum of points for every position whose answer equals the correct answer.
///
/// Unanswered positions and positions beyond either slice score nothing.
#[must_use]
pub fn score(questions: &[Question], answers: &[Option<String>]) -> u32 {
    questions
        .iter()
        .zip(answers)
        .filter(|(question, answer)| {
            answer
                .as_deref()
                .is_some_and(|answer| question.is_correct(answer))
        })
        .map(|_| POINTS_PER_QUESTION)
        .sum()
}

#[must_use]
pub fn max_score(question_count: usize) -> u32 {
    u32::try_from(question_count)
        .unwrap_or(u32::MAX)
        .saturating_mul(POINTS_PER_QUESTION)
}

/// `score / max_score >= 0.70`, in integer arithmetic.
#[must_use]
pub fn is_passing(score: u32, max_score: u32) -> bool {
    if max_score == 0 {
        return false;
    }
    u64::from(score) * 100 >= u64::from(max_score) * u64::from(PASS_PERCENT)
}

/// Score as a whole percentage of the maximum, rounded half up.
#[must_use]
pub fn percentage(score: u32, max_score: u32) -> u32 {
    if max_score == 0 {
        return 0;
    }
    let scaled = u64::from(score) * 100 + u64::from(max_score) / 2;
    u32::try_from(scaled / u64::from(max_score)).unwrap_or(u32::MAX)
}
