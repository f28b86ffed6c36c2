use std::sync::Arc;

use chrono::{DateTime, Utc};
use quiz_core::Clock;
use remote::{QuizContext, RemoteError, Speaker, TutorClient, TutorRequest, TutorTurn};

pub const GREETING: &str = "Hey there! I'm your AI tutor. How can I help you today?";
pub const FALLBACK_REPLY: &str =
    "Sorry, I'm having trouble connecting to the AI tutor. Please try again later.";
pub const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";
pub const SIGNED_OUT: &str = "Your session has expired.";

/// How many earlier messages travel with each question.
pub const HISTORY_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: String,
    pub from: Speaker,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    #[must_use]
    pub fn is_bot(&self) -> bool {
        self.from == Speaker::Bot
    }
}

/// Conversation with the remote AI tutor.
///
/// Connection problems never surface as errors; they show up in the
/// conversation as a bot message instead. A rejected access token signs the
/// chat out, after which questions are no longer sent.
pub struct TutorChat {
    client: Arc<dyn TutorClient>,
    clock: Clock,
    user_id: Option<String>,
    signed_in: bool,
    messages: Vec<ChatMessage>,
}

impl TutorChat {
    #[must_use]
    pub fn new(client: Arc<dyn TutorClient>, clock: Clock) -> Self {
        let greeting = ChatMessage {
            text: GREETING.to_owned(),
            from: Speaker::Bot,
            sent_at: clock.now(),
        };
        Self {
            client,
            clock,
            user_id: None,
            signed_in: true,
            messages: vec![greeting],
        }
    }

    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    #[must_use]
    pub fn with_signed_in(mut self, signed_in: bool) -> Self {
        self.signed_in = signed_in;
        self
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.signed_in
    }

    /// Send `text` and append the tutor's reply.
    ///
    /// Blank input is ignored and returns `None`; otherwise the learner
    /// message and the reply are appended and the reply is returned.
    pub async fn send(&mut self, text: &str, quiz: QuizContext) -> Option<&ChatMessage> {
        let message = text.trim();
        if message.is_empty() {
            return None;
        }

        let history = self.history();
        self.push(Speaker::Learner, message.to_owned());

        let reply = if self.signed_in {
            let request = TutorRequest {
                message: message.to_owned(),
                user_id: self.user_id.clone(),
                quiz,
                history,
            };
            self.ask(&request).await
        } else {
            SIGNED_OUT.to_owned()
        };

        self.push(Speaker::Bot, reply);
        self.messages.last()
    }

    async fn ask(&mut self, request: &TutorRequest) -> String {
        match self.client.ask(request).await {
            Ok(reply) => reply,
            Err(RemoteError::Unauthorized) => {
                tracing::info!("tutor rejected the access token; signing out");
                self.signed_in = false;
                SESSION_EXPIRED.to_owned()
            }
            Err(err) => {
                tracing::warn!(%err, "tutor request failed");
                FALLBACK_REPLY.to_owned()
            }
        }
    }

    fn history(&self) -> Vec<TutorTurn> {
        let skip = self.messages.len().saturating_sub(HISTORY_WINDOW);
        self.messages[skip..]
            .iter()
            .map(|message| TutorTurn {
                speaker: message.from,
                text: message.text.clone(),
                sent_at: message.sent_at,
            })
            .collect()
    }

    fn push(&mut self, from: Speaker, text: String) {
        self.messages.push(ChatMessage {
            text,
            from,
            sent_at: self.clock.now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_clock;
    use remote::InMemoryBackend;

    fn chat(backend: &InMemoryBackend) -> TutorChat {
        TutorChat::new(Arc::new(backend.clone()), fixed_clock())
    }

    #[tokio::test]
    async fn starts_with_greeting_and_ignores_blank_input() {
        let backend = InMemoryBackend::new();
        let mut chat = chat(&backend);
        assert_eq!(chat.messages()[0].text, GREETING);

        assert!(chat.send("   ", QuizContext::default()).await.is_none());
        assert_eq!(chat.messages().len(), 1);
        assert!(backend.tutor_requests().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sends_trimmed_message_with_quiz_context() {
        let backend = InMemoryBackend::new();
        backend.push_tutor_reply(Ok("Binary is base 2.".into())).unwrap();
        let mut chat = chat(&backend).with_user_id("42");
        let quiz = QuizContext {
            completed: true,
            score: 70,
            total_questions: 10,
        };

        let reply = chat.send("  what is binary? ", quiz).await.unwrap();
        assert_eq!(reply.text, "Binary is base 2.");
        assert!(reply.is_bot());

        let requests = backend.tutor_requests().unwrap();
        let request = &requests[0];
        assert_eq!(request.message, "what is binary?");
        assert_eq!(request.user_id.as_deref(), Some("42"));
        assert_eq!(request.quiz, quiz);
        assert_eq!(request.history.len(), 1);
    }

    #[tokio::test]
    async fn history_is_limited_to_last_five_messages() {
        let backend = InMemoryBackend::new();
        let mut chat = chat(&backend);
        for n in 0..4 {
            backend.push_tutor_reply(Ok(format!("reply {n}"))).unwrap();
            chat.send(&format!("question {n}"), QuizContext::default())
                .await
                .unwrap();
        }

        let requests = backend.tutor_requests().unwrap();
        let last = requests.last().unwrap();
        assert_eq!(last.history.len(), HISTORY_WINDOW);
        assert_eq!(last.history[HISTORY_WINDOW - 1].text, "reply 2");
    }

    #[tokio::test]
    async fn failures_become_fallback_reply() {
        let backend = InMemoryBackend::new();
        let mut chat = chat(&backend);

        let reply = chat.send("hello", QuizContext::default()).await.unwrap();
        assert_eq!(reply.text, FALLBACK_REPLY);
        assert!(chat.is_signed_in());
    }

    #[tokio::test]
    async fn unauthorized_signs_the_chat_out() {
        let backend = InMemoryBackend::new();
        backend
            .push_tutor_reply(Err(RemoteError::Unauthorized))
            .unwrap();
        let mut chat = chat(&backend);

        let reply = chat.send("hello", QuizContext::default()).await.unwrap();
        assert_eq!(reply.text, SESSION_EXPIRED);
        assert!(!chat.is_signed_in());

        let reply = chat.send("again", QuizContext::default()).await.unwrap();
        assert_eq!(reply.text, SIGNED_OUT);
        assert_eq!(backend.tutor_requests().unwrap().len(), 1);
    }
}
