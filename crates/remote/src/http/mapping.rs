use quiz_core::model::{AnswerOption, OptionId, Question, QuestionId, Topic, TopicId};
use serde::{Deserialize, Serialize};

use crate::gateway::{AuthSession, Credentials, Registration, RemoteError, Speaker, TutorRequest};

/// Prompt used when the backend sends a question without usable text.
pub(crate) const MISSING_PROMPT: &str = "Question text unavailable";
/// Text used for an option the backend sent without a string.
pub(crate) const MISSING_OPTION: &str = "Option text unavailable";

fn decode<E: core::fmt::Display>(e: E) -> RemoteError {
    RemoteError::Decode(e.to_string())
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub(crate) struct OptionDto {
    id: u64,
    #[serde(default)]
    text: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionDto {
    id: u64,
    #[serde(default)]
    text: Option<serde_json::Value>,
    #[serde(default, alias = "answers")]
    options: Option<Vec<OptionDto>>,
    #[serde(default)]
    correct_answer: Option<String>,
}

/// Turn a loosely-typed backend question into a domain `Question`.
///
/// A prompt that is missing, not a string or blank is replaced with a
/// placeholder; missing options become an empty list and a missing correct
/// answer becomes the empty string. Option text that is not a string gets its
/// own placeholder, so one bad option does not sink the whole quiz.
pub(crate) fn map_question(dto: QuestionDto) -> Result<Question, RemoteError> {
    let prompt = match dto.text {
        Some(serde_json::Value::String(text)) if !text.trim().is_empty() => text,
        _ => MISSING_PROMPT.to_owned(),
    };
    let options = dto
        .options
        .unwrap_or_default()
        .into_iter()
        .map(|option| AnswerOption::new(OptionId::new(option.id), option_text(option.text)))
        .collect();

    Question::new(
        QuestionId::new(dto.id),
        prompt,
        options,
        dto.correct_answer.unwrap_or_default(),
    )
    .map_err(decode)
}

fn option_text(raw: Option<serde_json::Value>) -> String {
    match raw {
        Some(serde_json::Value::String(text)) => text,
        _ => MISSING_OPTION.to_owned(),
    }
}

pub(crate) fn map_questions(dtos: Vec<QuestionDto>) -> Result<Vec<Question>, RemoteError> {
    dtos.into_iter().map(map_question).collect()
}

//
// ─── TOPICS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub(crate) struct TopicDto {
    id: u64,
    name: String,
}

pub(crate) fn map_topics(dtos: Vec<TopicDto>) -> Result<Vec<Topic>, RemoteError> {
    dtos.into_iter()
        .map(|dto| Topic::new(TopicId::new(dto.id), dto.name).map_err(decode))
        .collect()
}

//
// ─── TUTOR ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TutorTurnDto<'a> {
    text: &'a str,
    is_bot: bool,
    timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuizDataDto {
    completed: bool,
    score: u32,
    total_questions: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TutorRequestDto<'a> {
    message: &'a str,
    user_id: &'a str,
    quiz_data: QuizDataDto,
    conversation_history: Vec<TutorTurnDto<'a>>,
}

impl<'a> From<&'a TutorRequest> for TutorRequestDto<'a> {
    fn from(request: &'a TutorRequest) -> Self {
        Self {
            message: &request.message,
            user_id: request.user_id.as_deref().unwrap_or_default(),
            quiz_data: QuizDataDto {
                completed: request.quiz.completed,
                score: request.quiz.score,
                total_questions: request.quiz.total_questions,
            },
            conversation_history: request
                .history
                .iter()
                .map(|turn| TutorTurnDto {
                    text: &turn.text,
                    is_bot: turn.speaker == Speaker::Bot,
                    timestamp: turn.sent_at.to_rfc3339(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TutorResponseDto {
    response: Option<String>,
}

pub(crate) fn map_tutor_reply(dto: TutorResponseDto) -> Result<String, RemoteError> {
    dto.response
        .ok_or_else(|| RemoteError::Decode("tutor reply missing `response`".into()))
}

//
// ─── ACCOUNTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequestDto<'a> {
    username: &'a str,
    password: &'a str,
}

impl<'a> From<&'a Credentials> for LoginRequestDto<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        Self {
            username: &credentials.username,
            password: &credentials.password,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponseDto {
    token: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// The backend echoes the username; fall back to the one signed in with.
pub(crate) fn map_login(
    dto: LoginResponseDto,
    credentials: &Credentials,
) -> Result<AuthSession, RemoteError> {
    let token = dto
        .token
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| RemoteError::Decode("login reply missing `token`".into()))?;
    Ok(AuthSession {
        token,
        username: dto
            .username
            .unwrap_or_else(|| credentials.username.clone()),
        email: dto.email.unwrap_or_default(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterRequestDto<'a> {
    account_type: &'static str,
    full_name: &'a str,
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

impl<'a> From<&'a Registration> for RegisterRequestDto<'a> {
    fn from(registration: &'a Registration) -> Self {
        Self {
            account_type: registration.account_type.as_str(),
            full_name: &registration.full_name,
            username: &registration.credentials.username,
            email: &registration.email,
            password: &registration.credentials.password,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PasswordResetDto<'a> {
    pub(crate) email: &'a str,
}
