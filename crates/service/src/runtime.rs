//! Runtime environment helpers
//!
//! Startup wiring shared by the binary and the HTTP tests: directory checks
//! via `common::env` and construction of the handler graph from config.

use std::sync::Arc;

use configs::AppConfig;
use tracing::info;

use crate::auth::{repo::FileIdentityRepository, repository::IdentityRepository, service::AuthConfig, AuthService};
use crate::chat::{ChatRelay, OpenAiChatRelay};
use crate::handlers::Handlers;
use crate::storage::DocumentStore;

/// Ensure the data directory exists; warn when the chat API key file is missing.
pub async fn ensure_env(cfg: &AppConfig) -> anyhow::Result<()> {
    common::env::ensure_data_dir(&cfg.storage.data_dir).await?;
    if std::env::var("OPENAI_API_KEY").is_err() {
        common::env::check_secret_file(&cfg.chat.api_key_path()).await;
    }
    Ok(())
}

/// Build the production handlers: file-backed identities, the flat-file
/// document and the OpenAI-compatible chat relay.
pub async fn build_handlers(cfg: &AppConfig) -> anyhow::Result<Handlers> {
    let io_timeout = cfg.storage.io_timeout();

    let identities = FileIdentityRepository::new(&cfg.storage.credentials_file, io_timeout).await?;
    info!(users = identities.count().await, path = %cfg.storage.credentials_file, "identity store loaded");
    let repo: Arc<dyn IdentityRepository> = Arc::new(identities);
    let auth = Arc::new(AuthService::new(repo, AuthConfig::default()));

    let documents = Arc::new(DocumentStore::with_io_timeout(&cfg.storage.document_file, io_timeout));

    let api_key = cfg.chat.resolve_api_key();
    let relay: Arc<dyn ChatRelay> = Arc::new(OpenAiChatRelay::from_config(&cfg.chat, api_key)?);

    Ok(Handlers::new(auth, documents, relay))
}
