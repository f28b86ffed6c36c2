mod controller;
mod events;
mod loader;
mod runner;
mod timer;

pub use controller::QuizController;
pub use events::QuizEvent;
pub use loader::QuizLoader;
pub use runner::{QuizRunner, QuizView};
pub use timer::{ManualTimer, TickSink, Timer, TimerHandle, TokioTimer};
