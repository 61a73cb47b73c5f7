use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use chrono::Utc;
use rand::rngs::OsRng;
use tracing::{info, debug, instrument};

use super::domain::{RegisterInput, LoginInput, AuthUser, StoredCredentials};
use super::errors::AuthError;
use super::repository::IdentityRepository;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub password_algorithm: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { password_algorithm: "argon2".into() }
    }
}

/// Auth business service independent of web framework
pub struct AuthService<R: IdentityRepository + ?Sized> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

impl<R: IdentityRepository + ?Sized> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    /// Register a new identity with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockIdentityRepository};
    /// use service::auth::domain::RegisterInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockIdentityRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig::default());
    /// let input = RegisterInput { username: "alice".into(), password: "pw1".into() };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.username, "alice");
    /// ```
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        if input.username.is_empty() || input.password.is_empty() {
            return Err(AuthError::Validation("username and password are required".into()));
        }
        if self.repo.find_credentials(&input.username).await?.is_some() {
            debug!("user exists");
            return Err(AuthError::Conflict);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(input.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        let created_at = Utc::now();
        let credentials = StoredCredentials {
            password_hash: hash,
            password_algorithm: self.cfg.password_algorithm.clone(),
            created_at,
        };
        // the repository re-checks under its own lock; a racing registration loses here
        self.repo.create(&input.username, credentials).await?;
        info!(username = %input.username, "user_registered");
        Ok(AuthUser { username: input.username, created_at })
    }

    /// Verify a username/password pair.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockIdentityRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockIdentityRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig::default());
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { username: "bob".into(), password: "pw2".into() }));
    /// let user = tokio_test::block_on(svc.authenticate(LoginInput { username: "bob".into(), password: "pw2".into() })).unwrap();
    /// assert_eq!(user.username, "bob");
    /// assert!(tokio_test::block_on(svc.authenticate(LoginInput { username: "bob".into(), password: "nope".into() })).is_err());
    /// ```
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn authenticate(&self, input: LoginInput) -> Result<AuthUser, AuthError> {
        let cred = self.repo
            .find_credentials(&input.username)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        if Argon2::default().verify_password(input.password.as_bytes(), &parsed).is_err() {
            debug!("password mismatch");
            return Err(AuthError::Unauthorized);
        }

        Ok(AuthUser { username: input.username, created_at: cred.created_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::mock::MockIdentityRepository;

    fn service() -> (Arc<MockIdentityRepository>, AuthService<MockIdentityRepository>) {
        let repo = Arc::new(MockIdentityRepository::default());
        (repo.clone(), AuthService::new(repo, AuthConfig::default()))
    }

    fn register(username: &str, password: &str) -> RegisterInput {
        RegisterInput { username: username.into(), password: password.into() }
    }

    fn login(username: &str, password: &str) -> LoginInput {
        LoginInput { username: username.into(), password: password.into() }
    }

    #[tokio::test]
    async fn register_then_authenticate() -> Result<(), anyhow::Error> {
        let (_, svc) = service();
        svc.register(register("alice", "pw1")).await?;
        let user = svc.authenticate(login("alice", "pw1")).await?;
        assert_eq!(user.username, "alice");
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_register_keeps_original_password() -> Result<(), anyhow::Error> {
        let (repo, svc) = service();
        svc.register(register("bob", "pw2")).await?;
        let err = svc.register(register("bob", "anything")).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict));
        assert_eq!(repo.len(), 1);

        svc.authenticate(login("bob", "pw2")).await?;
        assert!(matches!(svc.authenticate(login("bob", "anything")).await, Err(AuthError::Unauthorized)));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_are_unauthorized() -> Result<(), anyhow::Error> {
        let (_, svc) = service();
        assert!(matches!(svc.authenticate(login("ghost", "pw")).await, Err(AuthError::Unauthorized)));

        svc.register(register("carol", "right")).await?;
        assert!(matches!(svc.authenticate(login("carol", "wrong")).await, Err(AuthError::Unauthorized)));
        // usernames are case-sensitive
        assert!(matches!(svc.authenticate(login("Carol", "right")).await, Err(AuthError::Unauthorized)));
        Ok(())
    }

    #[tokio::test]
    async fn empty_fields_rejected_without_storing() {
        let (repo, svc) = service();
        assert!(matches!(svc.register(register("", "pw")).await, Err(AuthError::Validation(_))));
        assert!(matches!(svc.register(register("dave", "")).await, Err(AuthError::Validation(_))));
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn stored_hash_is_not_the_password() -> Result<(), anyhow::Error> {
        let (repo, svc) = service();
        svc.register(register("erin", "secret")).await?;
        let cred = repo.find_credentials("erin").await?.expect("stored");
        assert_ne!(cred.password_hash, "secret");
        assert!(cred.password_hash.starts_with("$argon2"));
        assert_eq!(cred.password_algorithm, "argon2");
        Ok(())
    }
}
