use async_trait::async_trait;

use super::domain::StoredCredentials;
use super::errors::AuthError;

/// Repository abstraction for identity persistence.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn find_credentials(&self, username: &str) -> Result<Option<StoredCredentials>, AuthError>;

    /// Store credentials for a new username. Fails with [`AuthError::Conflict`]
    /// if the username is taken; never overwrites.
    async fn create(&self, username: &str, credentials: StoredCredentials) -> Result<(), AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockIdentityRepository {
        users: Mutex<HashMap<String, StoredCredentials>>,
    }

    impl MockIdentityRepository {
        pub fn len(&self) -> usize {
            self.users.lock().map(|u| u.len()).unwrap_or(0)
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl IdentityRepository for MockIdentityRepository {
        async fn find_credentials(&self, username: &str) -> Result<Option<StoredCredentials>, AuthError> {
            let users = self.users.lock().map_err(|e| AuthError::Repository(e.to_string()))?;
            Ok(users.get(username).cloned())
        }

        async fn create(&self, username: &str, credentials: StoredCredentials) -> Result<(), AuthError> {
            let mut users = self.users.lock().map_err(|e| AuthError::Repository(e.to_string()))?;
            if users.contains_key(username) {
                return Err(AuthError::Conflict);
            }
            users.insert(username.to_string(), credentials);
            Ok(())
        }
    }
}
