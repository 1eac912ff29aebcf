//! Credential store and session issuing.
//!
//! The rest of the crate only sees [`IdentityProvider`]; [`LocalIdentityProvider`]
//! keeps argon2 hashes in `auth_users`, signs JWT access tokens and rotates opaque
//! refresh tokens whose SHA-256 digests live in `refresh_tokens`.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::Duration;

use crate::core::config::SecuritySettings;
use crate::core::security::{self, SecurityError};
use crate::core::time::primitive_now_utc;
use crate::repositories::{auth_users, new_id, refresh_tokens};

#[derive(Debug, Error)]
pub(crate) enum IdentityError {
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("Invalid access token")]
    InvalidAccessToken,
    #[error("A user with this email address has already been registered")]
    EmailTaken,
    #[error(transparent)]
    Security(#[from] SecurityError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) user_id: String,
    pub(crate) session_id: String,
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IdentityUser {
    pub(crate) id: String,
    pub(crate) email: String,
}

#[async_trait]
pub(crate) trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError>;
    async fn refresh(&self, refresh_token: &str) -> Result<Session, IdentityError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;
    async fn create_user(&self, email: &str, password: &str)
        -> Result<IdentityUser, IdentityError>;
    async fn delete_user(&self, id: &str) -> Result<bool, IdentityError>;
    async fn update_user(
        &self,
        id: &str,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<bool, IdentityError>;
    async fn find_user_by_email(&self, email: &str)
        -> Result<Option<IdentityUser>, IdentityError>;
    /// Returns the user id carried by a valid, unexpired access token.
    fn verify_access_token(&self, token: &str) -> Result<String, IdentityError>;
}

pub(crate) struct LocalIdentityProvider {
    pool: PgPool,
    security: SecuritySettings,
}

impl LocalIdentityProvider {
    pub(crate) fn new(pool: PgPool, security: SecuritySettings) -> Self {
        Self { pool, security }
    }

    async fn issue_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Session, IdentityError> {
        let access_token =
            security::create_access_token(user_id, session_id, &self.security, None)?;
        let refresh_token = security::generate_refresh_token();
        let expires_at = primitive_now_utc()
            + Duration::days(self.security.refresh_token_expire_days as i64);

        refresh_tokens::create(
            &self.pool,
            refresh_tokens::CreateRefreshToken {
                id: &new_id(),
                user_id,
                session_id,
                token_hash: &security::digest_token(&refresh_token),
                expires_at,
            },
        )
        .await?;

        Ok(Session {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            access_token,
            refresh_token,
        })
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let user = auth_users::find_by_email(&self.pool, email.trim())
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        if !security::verify_password(password, &user.hashed_password).unwrap_or(false) {
            return Err(IdentityError::InvalidCredentials);
        }

        self.issue_session(&user.id, &new_id()).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        let digest = security::digest_token(refresh_token);
        let stored = refresh_tokens::find_by_hash(&self.pool, &digest)
            .await?
            .ok_or(IdentityError::InvalidRefreshToken)?;

        if stored.revoked_at.is_some() || stored.expires_at <= primitive_now_utc() {
            return Err(IdentityError::InvalidRefreshToken);
        }

        // A concurrent refresh may have consumed the token first.
        if !refresh_tokens::revoke(&self.pool, &stored.id).await? {
            return Err(IdentityError::InvalidRefreshToken);
        }

        self.issue_session(&stored.user_id, &stored.session_id).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let claims = security::verify_token(access_token, &self.security)
            .map_err(|_| IdentityError::InvalidAccessToken)?;
        let revoked = refresh_tokens::revoke_session(&self.pool, &claims.sid).await?;
        tracing::debug!(user_id = %claims.sub, revoked, "Session signed out");
        Ok(())
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentityUser, IdentityError> {
        if auth_users::find_by_email(&self.pool, email).await?.is_some() {
            return Err(IdentityError::EmailTaken);
        }

        let hashed_password = security::hash_password(password)?;
        match auth_users::create(&self.pool, &new_id(), email, &hashed_password).await {
            Ok(user) => Ok(IdentityUser { id: user.id, email: user.email }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(IdentityError::EmailTaken)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_user(&self, id: &str) -> Result<bool, IdentityError> {
        Ok(auth_users::delete(&self.pool, id).await?)
    }

    async fn update_user(
        &self,
        id: &str,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<bool, IdentityError> {
        let hashed_password = password.map(security::hash_password).transpose()?;
        match auth_users::update(&self.pool, id, email, hashed_password.as_deref()).await {
            Ok(updated) => Ok(updated),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(IdentityError::EmailTaken)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<IdentityUser>, IdentityError> {
        Ok(auth_users::find_by_email(&self.pool, email)
            .await?
            .map(|user| IdentityUser { id: user.id, email: user.email }))
    }

    fn verify_access_token(&self, token: &str) -> Result<String, IdentityError> {
        security::verify_token(token, &self.security)
            .map(|claims| claims.sub)
            .map_err(|_| IdentityError::InvalidAccessToken)
    }
}
