use thiserror::Error;

use crate::auth::errors::AuthError;
use crate::chat::ChatError;
use crate::storage::StoreError;

/// Coarse classification used to pick the HTTP status of an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Conflict,
    Io,
    Upstream,
}

/// Handler failures. `Display` is the literal message returned to clients.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Username and password not provided")]
    MissingCredentials,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User already exists")]
    UserExists,
    #[error("JSON data not provided")]
    MissingPayload,
    #[error("Invalid JSON data")]
    InvalidPayload(#[source] serde_json::Error),
    #[error("Chat history not provided")]
    MissingChatHistory,
    #[error("Invalid chat history")]
    InvalidChatHistory(#[source] serde_json::Error),
    #[error("Storage error")]
    Storage(#[from] StoreError),
    #[error("Identity provider error")]
    Identity(#[source] AuthError),
    #[error("Chat completion failed")]
    Upstream(#[from] ChatError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredentials
            | Self::MissingPayload
            | Self::InvalidPayload(_)
            | Self::MissingChatHistory
            | Self::InvalidChatHistory(_) => ErrorKind::Validation,
            Self::InvalidCredentials => ErrorKind::Authentication,
            Self::UserExists => ErrorKind::Conflict,
            Self::Storage(_) | Self::Identity(_) => ErrorKind::Io,
            Self::Upstream(_) => ErrorKind::Upstream,
        }
    }

    /// Client-facing message.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(_) => Self::MissingCredentials,
            AuthError::Conflict => Self::UserExists,
            AuthError::Unauthorized => Self::InvalidCredentials,
            other => Self::Identity(other),
        }
    }
}
