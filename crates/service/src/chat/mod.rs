//! Chat relay: forwards a conversation to a remote chat-completion API with a
//! fixed system prompt in front and returns the assistant's reply text.

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use openai::OpenAiChatRelay;

/// Prepended to every conversation before it is sent upstream.
pub const SYSTEM_PROMPT: &str = "You are the built-in assistant of Replit Migrator, a desktop \
application that helps people move their projects off Replit. Replit Migrator can download every \
repl of an account in one batch, keep a local copy of each project with its files and metadata, \
search and browse the downloaded projects, open them in a local editor, and back up the project \
list to the Replit Migrator cloud account so it can be restored on another machine. Answer \
questions about using the application and about migrating projects concisely and accurately.";

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self { role: role.into(), content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat relay is not configured: {0}")]
    Config(String),
    #[error("chat request failed: {0}")]
    Transport(String),
    #[error("chat request timed out")]
    Timeout,
    #[error("chat API returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("chat API returned no choices")]
    EmptyReply,
}

/// Remote completion capability.
#[async_trait]
pub trait ChatRelay: Send + Sync {
    /// `history` is the caller's conversation, without the system prompt.
    async fn relay(&self, history: &[ChatMessage]) -> Result<String, ChatError>;
}

/// The conversation actually sent upstream: system prompt first, then `history` unchanged.
pub fn with_system_prompt(history: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));
    messages.extend_from_slice(history);
    messages
}

/// Canned relay for tests: returns a fixed reply and records what it was sent.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    pub struct StaticChatRelay {
        reply: Result<String, String>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl StaticChatRelay {
        pub fn replying(reply: impl Into<String>) -> Self {
            Self { reply: Ok(reply.into()), calls: Mutex::new(Vec::new()) }
        }

        /// Every call fails with [`ChatError::Transport`].
        pub fn failing(reason: impl Into<String>) -> Self {
            Self { reply: Err(reason.into()), calls: Mutex::new(Vec::new()) }
        }

        pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl ChatRelay for StaticChatRelay {
        async fn relay(&self, history: &[ChatMessage]) -> Result<String, ChatError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(with_system_prompt(history));
            }
            self.reply.clone().map_err(ChatError::Transport)
        }
    }
}
