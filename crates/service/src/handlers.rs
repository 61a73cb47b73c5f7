//! Request handlers: validate the request fields, check credentials with the
//! identity provider, then touch the document store or the chat relay.
//!
//! Every data operation re-authenticates. A failure at any step returns
//! before the store is mutated.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::auth::domain::{LoginInput, RegisterInput};
use crate::auth::repository::IdentityRepository;
use crate::auth::AuthService;
use crate::chat::{ChatMessage, ChatRelay};
use crate::errors::ServiceError;
use crate::storage::DocumentStore;

/// `username` + `password` as sent by the client; empty counts as missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsInput {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CredentialsInput {
    #[cfg(test)]
    pub fn new(username: &str, password: &str) -> Self {
        Self { username: Some(username.into()), password: Some(password.into()) }
    }

    fn require(&self) -> Result<(&str, &str), ServiceError> {
        match (non_empty(&self.username), non_empty(&self.password)) {
            (Some(u), Some(p)) => Ok((u, p)),
            _ => Err(ServiceError::MissingCredentials),
        }
    }
}

/// Upload form: credentials plus the JSON-encoded record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadInput {
    #[serde(flatten)]
    pub credentials: CredentialsInput,
    pub json: Option<String>,
}

/// Chat form: the JSON-encoded conversation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatInput {
    pub chat_history: Option<String>,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

pub struct Handlers {
    auth: Arc<AuthService<dyn IdentityRepository>>,
    documents: Arc<DocumentStore>,
    chat: Arc<dyn ChatRelay>,
}

impl Handlers {
    pub fn new(
        auth: Arc<AuthService<dyn IdentityRepository>>,
        documents: Arc<DocumentStore>,
        chat: Arc<dyn ChatRelay>,
    ) -> Self {
        Self { auth, documents, chat }
    }

    /// Create a new identity.
    #[instrument(skip_all, fields(username = input.username.as_deref().unwrap_or("")))]
    pub async fn register(&self, input: CredentialsInput) -> Result<(), ServiceError> {
        let (username, password) = input.require()?;
        self.auth
            .register(RegisterInput { username: username.to_string(), password: password.to_string() })
            .await?;
        Ok(())
    }

    /// The caller's stored record, `{}` if none.
    #[instrument(skip_all, fields(username = input.username.as_deref().unwrap_or("")))]
    pub async fn get_data(&self, input: CredentialsInput) -> Result<Value, ServiceError> {
        let username = self.authenticate(&input).await?;
        let document = self.documents.read().await?;
        Ok(document.get(&username))
    }

    /// Replace the caller's record with the decoded `json` field.
    #[instrument(skip_all, fields(username = input.credentials.username.as_deref().unwrap_or("")))]
    pub async fn set_data(&self, input: UploadInput) -> Result<(), ServiceError> {
        let username = self.authenticate(&input.credentials).await?;
        let raw = input.json.as_deref().ok_or(ServiceError::MissingPayload)?;
        let value: Value = serde_json::from_str(raw).map_err(ServiceError::InvalidPayload)?;

        self.documents.update(|doc| doc.set(&username, value)).await?;
        info!(username = %username, bytes = raw.len(), "user_data_saved");
        Ok(())
    }

    /// Remove the caller's record; succeeds whether or not one existed.
    #[instrument(skip_all, fields(username = input.username.as_deref().unwrap_or("")))]
    pub async fn delete_data(&self, input: CredentialsInput) -> Result<(), ServiceError> {
        let username = self.authenticate(&input).await?;
        self.documents.update(|doc| doc.delete(&username)).await?;
        info!(username = %username, "user_data_deleted");
        Ok(())
    }

    /// Forward the conversation to the chat relay. Not authenticated.
    #[instrument(skip_all)]
    pub async fn chat(&self, input: ChatInput) -> Result<String, ServiceError> {
        let raw = input
            .chat_history
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ServiceError::MissingChatHistory)?;
        let history: Vec<ChatMessage> = serde_json::from_str(raw).map_err(ServiceError::InvalidChatHistory)?;
        if history.is_empty() {
            return Err(ServiceError::MissingChatHistory);
        }

        let reply = self.chat.relay(&history).await?;
        info!(turns = history.len(), reply_len = reply.len(), "chat_relayed");
        Ok(reply)
    }

    async fn authenticate(&self, input: &CredentialsInput) -> Result<String, ServiceError> {
        let (username, password) = input.require()?;
        let user = self
            .auth
            .authenticate(LoginInput { username: username.to_string(), password: password.to_string() })
            .await?;
        Ok(user.username)
    }
}
