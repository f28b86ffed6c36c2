mod attempt;
mod ids;
mod level;
mod question;
mod topic;

pub use attempt::{AttemptReport, CompletionCause};
pub use ids::{AttemptId, OptionId, ParseIdError, QuestionId, TopicId};
pub use level::{Level, ParseLevelError};
pub use question::{AnswerOption, Question, QuestionError};
pub use topic::{Topic, TopicError};
