//! # JwtAuthProvider
//!
//! HS256 bearer tokens carrying the user id in `sub`, combined with Argon2
//! password hashing into a single [`AuthProvider`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use domains::{AccessToken, AppError, AuthProvider, Result, UserId};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::password::Argon2Hasher;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iss: String,
    iat: i64,
    exp: i64,
}

pub struct JwtAuthProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: chrono::Duration,
    hasher: Argon2Hasher,
}

impl JwtAuthProvider {
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        ttl: Duration,
        hasher: Argon2Hasher,
    ) -> Result<Self> {
        let issuer = issuer.into();
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::internal(format!("token lifetime out of range: {e}")))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer,
            ttl,
            hasher,
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("token signing failed: {e}")))
    }
}

#[async_trait]
impl AuthProvider for JwtAuthProvider {
    async fn hash_password(&self, password: &str) -> Result<String> {
        self.hasher.hash(password).await
    }

    async fn verify_password(&self, password: &str, hash: &str) -> bool {
        self.hasher.verify(password, hash).await
    }

    fn issue_token(&self, user: UserId) -> Result<AccessToken> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        Ok(AccessToken {
            access_token: self.sign(&claims)?,
            token_type: "Bearer",
            expires_at,
        })
    }

    fn verify_token(&self, token: &str) -> Result<UserId> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            AppError::Unauthorized("invalid or expired token".to_string())
        })?;
        data.claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthorized("token subject is not a user id".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-that-is-long-enough-for-hs256";

    fn provider() -> JwtAuthProvider {
        JwtAuthProvider::new(
            SECRET,
            "barter",
            Duration::from_secs(3600),
            Argon2Hasher::with_cost(8, 1, 1).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_issued_token_resolves_to_user() {
        let auth = provider();
        let token = auth.issue_token(UserId(42)).unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert!(token.expires_at > Utc::now());
        assert_eq!(auth.verify_token(&token.access_token).unwrap(), UserId(42));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let other = JwtAuthProvider::new(
            b"a-completely-different-secret-value!!",
            "barter",
            Duration::from_secs(3600),
            Argon2Hasher::default(),
        )
        .unwrap();
        let token = other.issue_token(UserId(1)).unwrap();
        assert!(matches!(
            provider().verify_token(&token.access_token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let auth = provider();
        let past = Utc::now().timestamp() - 7200;
        let token = auth
            .sign(&Claims {
                sub: "1".to_string(),
                iss: "barter".to_string(),
                iat: past,
                exp: past + 60,
            })
            .unwrap();
        assert!(auth.verify_token(&token).is_err());
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let auth = provider();
        let now = Utc::now().timestamp();
        let token = auth
            .sign(&Claims {
                sub: "1".to_string(),
                iss: "someone-else".to_string(),
                iat: now,
                exp: now + 600,
            })
            .unwrap();
        assert!(auth.verify_token(&token).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(provider().verify_token("not.a.jwt").is_err());
    }

    #[tokio::test]
    async fn test_password_round_trip_through_provider() {
        let auth = provider();
        let hash = auth.hash_password("correct horse").await.unwrap();
        assert!(auth.verify_password("correct horse", &hash).await);
    }
}
