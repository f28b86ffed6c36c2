#![forbid(unsafe_code)]

pub mod gateway;
pub mod http;

pub use gateway::{
    AccountType, AuthClient, AuthSession, Backend, Credentials, InMemoryBackend, QuestionSource,
    QuizContext, Registration, RemoteError, ResultReporter, Speaker, TopicCatalog, TutorClient,
    TutorRequest, TutorTurn,
};
pub use http::{BackendConfig, HttpBackend};
