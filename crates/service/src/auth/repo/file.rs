use std::{path::PathBuf, sync::Arc, time::Duration};

use crate::auth::domain::StoredCredentials;
use crate::auth::errors::AuthError;
use crate::auth::repository::IdentityRepository;
use crate::storage::{json_map_store::JsonMapStore, StoreError};

/// Credential store persisted as a JSON map of `username -> StoredCredentials`.
#[derive(Clone)]
pub struct FileIdentityRepository {
    store: Arc<JsonMapStore<String, StoredCredentials>>,
}

impl FileIdentityRepository {
    /// Initialize the repository from the given file path. Creates the file if missing.
    pub async fn new<P: Into<PathBuf>>(path: P, io_timeout: Duration) -> Result<Self, StoreError> {
        let store = JsonMapStore::with_io_timeout(path, io_timeout).await?;
        Ok(Self { store })
    }

    pub async fn count(&self) -> usize {
        self.store.list().await.len()
    }
}

#[async_trait::async_trait]
impl IdentityRepository for FileIdentityRepository {
    async fn find_credentials(&self, username: &str) -> Result<Option<StoredCredentials>, AuthError> {
        Ok(self.store.get(&username.to_string()).await)
    }

    async fn create(&self, username: &str, credentials: StoredCredentials) -> Result<(), AuthError> {
        let inserted = self
            .store
            .insert_new(username.to_string(), credentials)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        if inserted { Ok(()) } else { Err(AuthError::Conflict) }
    }
}
