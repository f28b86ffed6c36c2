use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{AttemptReport, Level, Question, Topic, TopicId};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use url::Url;

use crate::gateway::{
    AuthClient, AuthSession, Backend, Credentials, QuestionSource, Registration, RemoteError,
    ResultReporter, TopicCatalog, TutorClient, TutorRequest,
};

mod mapping;

use mapping::{
    LoginRequestDto, LoginResponseDto, PasswordResetDto, QuestionDto, RegisterRequestDto,
    TopicDto, TutorRequestDto, TutorResponseDto,
};

const QUESTIONS_PATH: &str = "api/quiz/quiz/questions/";
const RESULTS_PATH: &str = "api/quiz/quiz/results/";
const TOPICS_PATH: &str = "api/quiz/topics/";
const TUTOR_PATH: &str = "api/quiz/ai-tutor/";
const REGISTER_PATH: &str = "api/users/register/";
const LOGIN_PATH: &str = "api/users/login/";
const LOGOUT_PATH: &str = "api/users/logout/";
const PASSWORD_RESET_PATH: &str = "api/users/password-reset/";

/// Where the backend lives and how to authenticate against it.
///
/// The access token is passed in explicitly; nothing here reads ambient
/// cookies or globals.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    base_url: Url,
    access_token: Option<String>,
    timeout: Duration,
}

impl BackendConfig {
    /// # Errors
    ///
    /// Returns `RemoteError::InvalidUrl` if `base_url` cannot be parsed.
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let mut raw = base_url.trim().to_owned();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Ok(Self {
            base_url: Url::parse(&raw)?,
            access_token: None,
            timeout: Duration::from_secs(10),
        })
    }

    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.access_token = (!token.trim().is_empty()).then_some(token);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }
}

/// `reqwest`-backed adapter for the quiz backend's REST API.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpBackend {
    /// # Errors
    ///
    /// Returns `RemoteError::Http` if the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        Ok(self.config.base_url.join(path)?)
    }

    fn questions_url(&self, topic: TopicId, level: Level) -> Result<Url, RemoteError> {
        let mut url = self.endpoint(QUESTIONS_PATH)?;
        url.query_pairs_mut()
            .append_pair("topic_id", &topic.to_string())
            .append_pair("level", level.as_str());
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl Backend {
    #[must_use]
    pub fn http(backend: HttpBackend) -> Self {
        Self {
            questions: Arc::new(backend.clone()),
            reporter: Arc::new(backend.clone()),
            topics: Arc::new(backend.clone()),
            tutor: Arc::new(backend.clone()),
            auth: Arc::new(backend),
        }
    }
}

fn check(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    tracing::debug!(%status, url = %response.url(), "backend request rejected");
    Err(match status {
        StatusCode::BAD_REQUEST => RemoteError::Rejected,
        StatusCode::NOT_FOUND => RemoteError::NotFound,
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized,
        other => RemoteError::Status(other.as_u16()),
    })
}

#[async_trait]
impl QuestionSource for HttpBackend {
    async fn fetch_questions(
        &self,
        topic: TopicId,
        level: Level,
    ) -> Result<Vec<Question>, RemoteError> {
        let url = self.questions_url(topic, level)?;
        let response = self.authorize(self.client.get(url)).send().await?;
        let dtos: Vec<QuestionDto> = check(response)?.json().await?;
        tracing::debug!(%topic, %level, count = dtos.len(), "questions fetched");
        mapping::map_questions(dtos)
    }
}

#[async_trait]
impl ResultReporter for HttpBackend {
    async fn report(&self, report: &AttemptReport) -> Result<(), RemoteError> {
        let url = self.endpoint(RESULTS_PATH)?;
        let response = self.authorize(self.client.post(url)).json(report).send().await?;
        check(response)?;
        Ok(())
    }
}

#[async_trait]
impl TopicCatalog for HttpBackend {
    async fn list_topics(&self) -> Result<Vec<Topic>, RemoteError> {
        let url = self.endpoint(TOPICS_PATH)?;
        let response = self.authorize(self.client.get(url)).send().await?;
        let dtos: Vec<TopicDto> = check(response)?.json().await?;
        mapping::map_topics(dtos)
    }
}

#[async_trait]
impl TutorClient for HttpBackend {
    async fn ask(&self, request: &TutorRequest) -> Result<String, RemoteError> {
        let url = self.endpoint(TUTOR_PATH)?;
        let payload = TutorRequestDto::from(request);
        let response = self
            .authorize(self.client.post(url))
            .json(&payload)
            .send()
            .await?;
        let dto: TutorResponseDto = check(response)?.json().await?;
        mapping::map_tutor_reply(dto)
    }
}

#[async_trait]
impl AuthClient for HttpBackend {
    async fn register(&self, registration: &Registration) -> Result<(), RemoteError> {
        let url = self.endpoint(REGISTER_PATH)?;
        let payload = RegisterRequestDto::from(registration);
        let response = self.client.post(url).json(&payload).send().await?;
        check(response)?;
        tracing::info!(username = %registration.credentials.username, "account registered");
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, RemoteError> {
        let url = self.endpoint(LOGIN_PATH)?;
        let payload = LoginRequestDto::from(credentials);
        let response = self.client.post(url).json(&payload).send().await?;
        let dto: LoginResponseDto = check(response)?.json().await?;
        mapping::map_login(dto, credentials)
    }

    async fn logout(&self, token: &str) -> Result<(), RemoteError> {
        let url = self.endpoint(LOGOUT_PATH)?;
        let response = self.client.post(url).bearer_auth(token).send().await?;
        check(response)?;
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), RemoteError> {
        let url = self.endpoint(PASSWORD_RESET_PATH)?;
        let response = self
            .client
            .post(url)
            .json(&PasswordResetDto { email })
            .send()
            .await?;
        check(response)?;
        Ok(())
    }
}
