use std::sync::Arc;

use rand::{distributions::Alphanumeric, Rng};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{User, UserSummary},
    storage::{TokenStore, UserStore},
};

const TOKEN_LENGTH: usize = 48;

pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<dyn TokenStore>) -> Self {
        Self { users, tokens }
    }

    /// Verifies credentials and issues a fresh bearer token. Unknown email
    /// and wrong password are logged apart but reported to the client with
    /// one uniform error, so accounts cannot be enumerated.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(UserSummary, String)> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::debug!(email, "login rejected: unknown email");
                return Err(AppError::InvalidCredentials);
            }
        };

        let matches = bcrypt::verify(password, &user.password_hash)
            .map_err(|e| anyhow::anyhow!("Hash error: {}", e))?;
        if !matches {
            tracing::debug!(email, "login rejected: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.issue_token(user.id).await?;
        Ok((UserSummary::from(&user), token))
    }

    /// Maps a presented token to its identity. Absence is a normal outcome
    /// for the middleware, not an error.
    pub async fn resolve_identity(&self, token: &str) -> AppResult<Option<User>> {
        let Some(record) = self.tokens.find(token).await? else {
            return Ok(None);
        };
        self.users.find_by_id(record.user_id).await
    }

    /// Revokes the presented token. Revoking an already-absent token still
    /// succeeds once the caller's identity is established.
    pub async fn logout(&self, token: &str) -> AppResult<()> {
        self.tokens.revoke(token).await
    }

    /// Rotates the presented token. The old token is revoked before the new
    /// one is issued; a crash in between leaves the session requiring a
    /// fresh login.
    pub async fn refresh(&self, user_id: Uuid, token: &str) -> AppResult<String> {
        self.tokens.revoke(token).await?;
        self.issue_token(user_id).await
    }

    async fn issue_token(&self, user_id: Uuid) -> AppResult<String> {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        self.tokens.insert(&token, user_id).await?;
        Ok(token)
    }
}

/// Hashes a password for storage, used when seeding identities.
pub fn hash_password(password: &str) -> AppResult<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| anyhow::anyhow!("Hash error: {}", e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::{InMemoryTokenStore, InMemoryUserStore};

    async fn service_with_user() -> AuthService {
        let users = Arc::new(InMemoryUserStore::default());
        // Low cost keeps the test fast; production uses DEFAULT_COST.
        let hash = bcrypt::hash("password", 4).unwrap();
        users
            .insert("Test User", "test@example.com", &hash)
            .await
            .unwrap();
        AuthService::new(users, Arc::new(InMemoryTokenStore::default()))
    }

    #[tokio::test]
    async fn login_issues_a_resolvable_token() {
        let auth = service_with_user().await;
        let (user, token) = auth.login("test@example.com", "password").await.unwrap();
        assert_eq!(user.email, "test@example.com");
        assert_eq!(token.len(), TOKEN_LENGTH);

        let resolved = auth.resolve_identity(&token).await.unwrap().unwrap();
        assert_eq!(resolved.email, "test@example.com");
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let auth = service_with_user().await;
        let unknown = auth.login("nobody@example.com", "password").await;
        let wrong = auth.login("test@example.com", "wrongpassword").await;
        assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
        assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn logout_invalidates_the_token() {
        let auth = service_with_user().await;
        let (_, token) = auth.login("test@example.com", "password").await.unwrap();
        auth.logout(&token).await.unwrap();
        assert!(auth.resolve_identity(&token).await.unwrap().is_none());
        // Idempotent once the identity is known.
        auth.logout(&token).await.unwrap();
    }

    #[tokio::test]
    async fn refresh_rotates_the_token() {
        let auth = service_with_user().await;
        let (user, old_token) = auth.login("test@example.com", "password").await.unwrap();
        let new_token = auth.refresh(user.id, &old_token).await.unwrap();
        assert_ne!(old_token, new_token);
        assert!(auth.resolve_identity(&old_token).await.unwrap().is_none());
        assert!(auth.resolve_identity(&new_token).await.unwrap().is_some());
    }
}
