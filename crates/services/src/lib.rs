#![forbid(unsafe_code)]

pub mod auth;
pub mod error;
pub mod quiz;
pub mod topics;
pub mod tutor;

pub use quiz_core::Clock;

pub use auth::AuthService;
pub use error::{AuthError, LoadError};
pub use quiz::{
    ManualTimer, QuizController, QuizEvent, QuizLoader, QuizRunner, QuizView, TickSink, Timer,
    TimerHandle, TokioTimer,
};
pub use topics::TopicService;
pub use tutor::{ChatMessage, TutorChat};
