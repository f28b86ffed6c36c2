use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{AttemptReport, Level, Question, Topic, TopicId};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by backend adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("request rejected by the backend")]
    Rejected,

    #[error("backend returned status {0}")]
    Status(u16),

    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid payload: {0}")]
    Decode(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

//
// ─── COLLABORATOR CONTRACTS ────────────────────────────────────────────────────
//

/// Supplies the ordered questions of a quiz.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch the questions for `topic` at `level`, in presentation order.
    ///
    /// An empty list is a valid response here; callers decide whether an
    /// empty quiz is an error.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` when the questions cannot be loaded or decoded.
    async fn fetch_questions(
        &self,
        topic: TopicId,
        level: Level,
    ) -> Result<Vec<Question>, RemoteError>;
}

/// Accepts the final result of an attempt.
#[async_trait]
pub trait ResultReporter: Send + Sync {
    /// # Errors
    ///
    /// Returns `RemoteError` if the report could not be delivered.
    async fn report(&self, report: &AttemptReport) -> Result<(), RemoteError>;
}

/// Lists the topics learners can choose from.
#[async_trait]
pub trait TopicCatalog: Send + Sync {
    /// # Errors
    ///
    /// Returns `RemoteError` when the catalog cannot be loaded or decoded.
    async fn list_topics(&self) -> Result<Vec<Topic>, RemoteError>;
}

/// Who wrote a line of the tutor conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Bot,
    Learner,
}

/// One earlier message sent along with a tutor question for context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorTurn {
    pub speaker: Speaker,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Quiz context the tutor may use to tailor its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuizContext {
    pub completed: bool,
    pub score: u32,
    pub total_questions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorRequest {
    pub message: String,
    pub user_id: Option<String>,
    pub quiz: QuizContext,
    pub history: Vec<TutorTurn>,
}

/// Remote AI tutor. Answer generation happens entirely on the backend.
#[async_trait]
pub trait TutorClient: Send + Sync {
    /// # Errors
    ///
    /// Returns `RemoteError::Unauthorized` when the access token is rejected,
    /// or another `RemoteError` when no reply could be obtained.
    async fn ask(&self, request: &TutorRequest) -> Result<String, RemoteError>;
}

/// Username and password for signing in.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountType {
    #[default]
    Student,
    Administrator,
}

impl AccountType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Administrator => "administrator",
        }
    }
}

/// A new account as submitted by the sign-up form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub account_type: AccountType,
    pub credentials: Credentials,
}

/// What a successful sign-in hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub username: String,
    pub email: String,
}

/// Account management on the backend.
///
/// Tokens are passed in and returned explicitly; adapters never store them.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// # Errors
    ///
    /// Returns `RemoteError::Rejected` when the backend refuses the account
    /// (for example a taken username).
    async fn register(&self, registration: &Registration) -> Result<(), RemoteError>;

    /// Exchange credentials for an access token.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Rejected` for wrong credentials.
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, RemoteError>;

    /// Revoke `token` on the backend.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Unauthorized` if the token is not active.
    async fn logout(&self, token: &str) -> Result<(), RemoteError>;

    /// Ask the backend to mail a password reset link to `email`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the request could not be delivered.
    async fn request_password_reset(&self, email: &str) -> Result<(), RemoteError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    topics: Vec<Topic>,
    questions: HashMap<(TopicId, Level), Vec<Question>>,
    reports: Vec<AttemptReport>,
    tutor_replies: VecDeque<Result<String, RemoteError>>,
    tutor_requests: Vec<TutorRequest>,
    fail_reports: bool,
    accounts: HashMap<String, Registration>,
    tokens: HashMap<String, String>,
    issued_tokens: u64,
    password_resets: Vec<String>,
}

/// In-process backend for tests and offline demos.
///
/// Clones share the same state, so a test can hand one clone to a service and
/// inspect what was reported through another.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, RemoteError> {
        self.state
            .lock()
            .map_err(|e| RemoteError::Unavailable(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the state lock is poisoned.
    pub fn add_topic(&self, topic: Topic) -> Result<(), RemoteError> {
        self.lock()?.topics.push(topic);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the state lock is poisoned.
    pub fn set_questions(
        &self,
        topic: TopicId,
        level: Level,
        questions: Vec<Question>,
    ) -> Result<(), RemoteError> {
        self.lock()?.questions.insert((topic, level), questions);
        Ok(())
    }

    /// Make every subsequent `report` call fail.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the state lock is poisoned.
    pub fn fail_reports(&self, fail: bool) -> Result<(), RemoteError> {
        self.lock()?.fail_reports = fail;
        Ok(())
    }

    /// Queue the outcome of the next tutor question.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the state lock is poisoned.
    pub fn push_tutor_reply(&self, reply: Result<String, RemoteError>) -> Result<(), RemoteError> {
        self.lock()?.tutor_replies.push_back(reply);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the state lock is poisoned.
    pub fn reports(&self) -> Result<Vec<AttemptReport>, RemoteError> {
        Ok(self.lock()?.reports.clone())
    }

    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the state lock is poisoned.
    pub fn tutor_requests(&self) -> Result<Vec<TutorRequest>, RemoteError> {
        Ok(self.lock()?.tutor_requests.clone())
    }

    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the state lock is poisoned.
    pub fn is_token_active(&self, token: &str) -> Result<bool, RemoteError> {
        Ok(self.lock()?.tokens.contains_key(token))
    }

    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the state lock is poisoned.
    pub fn password_resets(&self) -> Result<Vec<String>, RemoteError> {
        Ok(self.lock()?.password_resets.clone())
    }
}

#[async_trait]
impl QuestionSource for InMemoryBackend {
    async fn fetch_questions(
        &self,
        topic: TopicId,
        level: Level,
    ) -> Result<Vec<Question>, RemoteError> {
        self.lock()?
            .questions
            .get(&(topic, level))
            .cloned()
            .ok_or(RemoteError::NotFound)
    }
}

#[async_trait]
impl ResultReporter for InMemoryBackend {
    async fn report(&self, report: &AttemptReport) -> Result<(), RemoteError> {
        let mut guard = self.lock()?;
        if guard.fail_reports {
            return Err(RemoteError::Status(500));
        }
        guard.reports.push(report.clone());
        Ok(())
    }
}

#[async_trait]
impl TopicCatalog for InMemoryBackend {
    async fn list_topics(&self) -> Result<Vec<Topic>, RemoteError> {
        Ok(self.lock()?.topics.clone())
    }
}

#[async_trait]
impl TutorClient for InMemoryBackend {
    async fn ask(&self, request: &TutorRequest) -> Result<String, RemoteError> {
        let mut guard = self.lock()?;
        guard.tutor_requests.push(request.clone());
        guard
            .tutor_replies
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::Unavailable("no tutor reply queued".into())))
    }
}

#[async_trait]
impl AuthClient for InMemoryBackend {
    async fn register(&self, registration: &Registration) -> Result<(), RemoteError> {
        let mut guard = self.lock()?;
        let username = registration.credentials.username.clone();
        if guard.accounts.contains_key(&username) {
            return Err(RemoteError::Rejected);
        }
        guard.accounts.insert(username, registration.clone());
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, RemoteError> {
        let mut guard = self.lock()?;
        let email = match guard.accounts.get(&credentials.username) {
            Some(account) if account.credentials.password == credentials.password => {
                account.email.clone()
            }
            _ => return Err(RemoteError::Rejected),
        };
        guard.issued_tokens += 1;
        let token = format!("token-{}", guard.issued_tokens);
        guard
            .tokens
            .insert(token.clone(), credentials.username.clone());
        Ok(AuthSession {
            token,
            username: credentials.username.clone(),
            email,
        })
    }

    async fn logout(&self, token: &str) -> Result<(), RemoteError> {
        self.lock()?
            .tokens
            .remove(token)
            .map(|_| ())
            .ok_or(RemoteError::Unauthorized)
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), RemoteError> {
        self.lock()?.password_resets.push(email.to_owned());
        Ok(())
    }
}

/// Bundles every collaborator behind trait objects so adapters can be swapped.
#[derive(Clone)]
pub struct Backend {
    pub questions: Arc<dyn QuestionSource>,
    pub reporter: Arc<dyn ResultReporter>,
    pub topics: Arc<dyn TopicCatalog>,
    pub tutor: Arc<dyn TutorClient>,
    pub auth: Arc<dyn AuthClient>,
}

impl Backend {
    #[must_use]
    pub fn in_memory(backend: InMemoryBackend) -> Self {
        Self {
            questions: Arc::new(backend.clone()),
            reporter: Arc::new(backend.clone()),
            topics: Arc::new(backend.clone()),
            tutor: Arc::new(backend.clone()),
            auth: Arc::new(backend),
        }
    }
}
