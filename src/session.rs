// src/session.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use log::warn;
use thiserror::Error;

use crate::models::ConversationTurn;

/// Whatever produces the assistant's reply for a session.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn reply(&self, message: &str, history: &[ConversationTurn]) -> Result<String>;
}

/// The backend answered, but not with a success status.
#[derive(Debug, Error)]
#[error("backend replied with status {0}")]
pub struct BackendStatus(pub u16);

/// Conversation held by one front-end session. Turns are only ever appended,
/// except by an explicit `clear`.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    turns: Vec<ConversationTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session opened with the assistant's greeting.
    pub fn with_greeting() -> Self {
        let greeting = format!(
            "[{}] System initialized. Hello, I'm your personal AI assistant.",
            Local::now().format("%H:%M:%S")
        );
        Self {
            turns: vec![ConversationTurn::assistant(greeting)],
        }
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn::assistant(content));
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Appends `input`, asks `backend` with the turns that preceded it, and
    /// appends the reply (or a fallback apology). Returns the assistant text.
    pub async fn submit<B: ChatBackend + ?Sized>(&mut self, backend: &B, input: &str) -> String {
        let prior = self.turns.len();
        self.push_user(input);

        let reply = match backend.reply(input, &self.turns[..prior]).await {
            Ok(reply) => reply,
            Err(e) => match e.downcast_ref::<BackendStatus>() {
                Some(BackendStatus(code)) => {
                    warn!("Chat backend refused the request: {:#}", e);
                    format!("I'm sorry, I couldn't process your request. (Error {})", code)
                }
                None => {
                    warn!("Chat backend unavailable: {:#}", e);
                    format!(
                        "I'm sorry, I'm having trouble connecting to my backend. \
                         Please try again in a moment. Error: {}",
                        e
                    )
                }
            },
        };

        self.push_assistant(reply.clone());
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use anyhow::anyhow;
    use std::sync::Mutex;

    struct EchoBackend {
        seen_history_lengths: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn reply(&self, message: &str, history: &[ConversationTurn]) -> Result<String> {
            self.seen_history_lengths.lock().unwrap().push(history.len());
            Ok(format!("echo: {message}"))
        }
    }

    struct DownBackend;

    #[async_trait]
    impl ChatBackend for DownBackend {
        async fn reply(&self, _message: &str, _history: &[ConversationTurn]) -> Result<String> {
            Err(anyhow!("connection refused"))
        }
    }

    #[tokio::test]
    async fn history_is_exactly_the_submitted_sequence() {
        let backend = EchoBackend {
            seen_history_lengths: Mutex::new(Vec::new()),
        };
        let mut session = ChatSession::new();
        let inputs = ["hi", "tell me about stocks", "", "thanks"];

        for input in inputs {
            session.submit(&backend, input).await;
        }

        let expected: Vec<ConversationTurn> = inputs
            .iter()
            .flat_map(|i| {
                [
                    ConversationTurn::user(*i),
                    ConversationTurn::assistant(format!("echo: {i}")),
                ]
            })
            .collect();
        assert_eq!(session.history(), expected.as_slice());
        assert_eq!(*backend.seen_history_lengths.lock().unwrap(), vec![0, 2, 4, 6]);
    }

    #[test]
    fn manual_pushes_keep_order() {
        let mut session = ChatSession::new();
        for i in 0..10 {
            if i % 2 == 0 {
                session.push_user(format!("u{i}"));
            } else {
                session.push_assistant(format!("a{i}"));
            }
        }
        let contents: Vec<&str> = session.history().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["u0", "a1", "u2", "a3", "u4", "a5", "u6", "a7", "u8", "a9"]);
    }

    struct RefusingBackend;

    #[async_trait]
    impl ChatBackend for RefusingBackend {
        async fn reply(&self, _message: &str, _history: &[ConversationTurn]) -> Result<String> {
            Err(anyhow::Error::new(BackendStatus(503)).context("chat request failed"))
        }
    }

    #[tokio::test]
    async fn error_status_gets_its_own_apology() {
        let mut session = ChatSession::new();
        let reply = session.submit(&RefusingBackend, "hello?").await;

        assert_eq!(reply, "I'm sorry, I couldn't process your request. (Error 503)");
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[1], ConversationTurn::assistant(reply));
    }

    #[tokio::test]
    async fn backend_failure_appends_an_apology() {
        let mut session = ChatSession::with_greeting();
        let reply = session.submit(&DownBackend, "hello?").await;

        assert!(reply.contains("connection refused"));
        let history = session.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, Role::Assistant);
        assert!(history[0].content.contains("System initialized"));
        assert_eq!(history[1], ConversationTurn::user("hello?"));
        assert_eq!(history[2].role, Role::Assistant);
    }

    #[test]
    fn clear_empties_the_session() {
        let mut session = ChatSession::with_greeting();
        session.push_user("x");
        session.clear();
        assert!(session.history().is_empty());
    }
}
