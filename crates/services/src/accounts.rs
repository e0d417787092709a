//! Registration, login and bearer-token resolution.

use std::sync::Arc;

use domains::{
    AccessToken, AppError, AuthProvider, Credentials, Result, User, UserId, UserRepository,
};

const BAD_CREDENTIALS: &str = "invalid username or password";

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    auth: Arc<dyn AuthProvider>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { users, auth }
    }

    pub async fn register(&self, credentials: Credentials) -> Result<User> {
        let (username, password) = credentials.validate_new()?;
        let hash = self.auth.hash_password(&password).await?;
        let user = self.users.insert(&username, &hash).await?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Exchanges a username and password for a bearer token.
    pub async fn login(&self, credentials: Credentials) -> Result<AccessToken> {
        let (username, password) = credentials.require()?;
        let Some(record) = self.users.find_by_username(&username).await? else {
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };
        if !self.auth.verify_password(&password, &record.password_hash).await {
            tracing::debug!(user_id = %record.user.id, "password mismatch");
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }
        self.auth.issue_token(record.user.id)
    }

    /// Resolves a bearer token to a user that still exists.
    pub async fn authenticate(&self, token: &str) -> Result<UserId> {
        let user_id = self.auth.verify_token(token)?;
        match self.users.find(user_id).await? {
            Some(user) => Ok(user.id),
            None => Err(AppError::Unauthorized(
                "token refers to an unknown user".to_string(),
            )),
        }
    }
}
