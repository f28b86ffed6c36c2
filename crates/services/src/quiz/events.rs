use quiz_core::model::OptionId;

/// Everything that can change an attempt, in the order it happened.
///
/// Learner intents and timer ticks share one queue so they are applied one
/// at a time by a single consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizEvent {
    /// Choose an option of the current question by its text.
    Select(String),
    SelectOption(OptionId),
    Advance,
    Retreat,
    Skip,
    Submit,
    Tick,
    ToggleReview,
    ReviewNext,
    ReviewPrevious,
    /// The learner navigated away; stop the timer and end the loop.
    Teardown,
}

impl QuizEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Select(_) => "select",
            Self::SelectOption(_) => "select_option",
            Self::Advance => "advance",
            Self::Retreat => "retreat",
            Self::Skip => "skip",
            Self::Submit => "submit",
            Self::Tick => "tick",
            Self::ToggleReview => "toggle_review",
            Self::ReviewNext => "review_next",
            Self::ReviewPrevious => "review_previous",
            Self::Teardown => "teardown",
        }
    }
}
