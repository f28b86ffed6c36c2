mod countdown;
mod review;
pub mod scoring;
mod session;
mod snapshot;

pub use countdown::{Countdown, format_seconds};
pub use review::{OptionMark, option_marks};
pub use session::{QuizError, QuizPhase, QuizSession, Step, Tick, TransitionError};
pub use snapshot::{OptionView, QuestionView, QuizSnapshot};
