use serde::{Deserialize, Serialize};

use crate::model::Question;

/// Highlight state of a single option when a question is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionMark {
    Neutral,
    /// The chosen option is the correct one.
    Correct,
    /// The chosen option is not the correct one.
    Wrong,
    /// Review only: the correct option the learner did not choose.
    Missed,
}

/// Marks for every option of `question`, in option order.
///
/// While answering, only the chosen option is highlighted. In review the
/// correct option is always highlighted as well.
#[must_use]
pub fn option_marks(question: &Question, chosen: Option<&str>, reviewing: bool) -> Vec<OptionMark> {
    let correct = question.correct_answer();
    question
        .options()
        .iter()
        .map(|option| {
            let is_chosen = chosen == Some(option.text.as_str());
            let is_correct = option.text == correct;
            match (is_chosen, is_correct) {
                (true, true) => OptionMark::Correct,
                (true, false) => OptionMark::Wrong,
                (false, true) if reviewing => OptionMark::Missed,
                _ => OptionMark::Neutral,
            }
        })
        .collect()
}
