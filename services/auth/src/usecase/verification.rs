//! Email verification with six-digit codes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::repository::{Mailer, RateLimitRepository, UserRepository};
use crate::domain::types::{RateLimitScope, UserRecord, one_time_token_expired};
use crate::error::AuthServiceError;
use crate::usecase::password::PasswordHasher;
use crate::usecase::rate_limit::RateLimiter;
use crate::usecase::token::generate_verification_code;

#[derive(Debug, Serialize)]
pub struct VerificationRequestOutput {
    /// `false` when the email was already verified and nothing was sent.
    pub sent: bool,
    /// The code itself, only when dev-token exposure is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_code: Option<String>,
}

pub struct RequestVerificationUseCase<U: UserRepository, L: RateLimitRepository, M: Mailer> {
    pub users: U,
    pub limiter: RateLimiter<L>,
    pub mailer: M,
    pub hasher: PasswordHasher,
    pub expose_dev_tokens: bool,
}

impl<U, L, M> RequestVerificationUseCase<U, L, M>
where
    U: UserRepository,
    L: RateLimitRepository,
    M: Mailer,
{
    /// Issue a code for an authenticated caller.
    pub async fn execute(
        &self,
        user_id: Uuid,
        client: &str,
        now: DateTime<Utc>,
    ) -> Result<VerificationRequestOutput, AuthServiceError> {
        self.limiter
            .enforce(RateLimitScope::Verify, &format!("{client}:{user_id}"), now)
            .await?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;
        self.send_code(&user, now).await
    }

    /// Issue a code for a caller who cannot log in yet because the email is unverified.
    pub async fn execute_with_credentials(
        &self,
        username: &str,
        password: &str,
        client: &str,
        now: DateTime<Utc>,
    ) -> Result<VerificationRequestOutput, AuthServiceError> {
        self.limiter
            .enforce(RateLimitScope::Verify, &format!("{client}:{username}"), now)
            .await?;
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AuthServiceError::InvalidCredentials)?;
        if !self.hasher.verify(password, &user.password_hash).await? {
            return Err(AuthServiceError::InvalidCredentials);
        }
        self.send_code(&user, now).await
    }

    async fn send_code(
        &self,
        user: &UserRecord,
        now: DateTime<Utc>,
    ) -> Result<VerificationRequestOutput, AuthServiceError> {
        if user.email_verified {
            return Ok(VerificationRequestOutput {
                sent: false,
                dev_code: None,
            });
        }

        let code = generate_verification_code();
        self.users.set_verification_code(user.id, &code, now).await?;
        // The code is already stored, so a failed delivery can still be retried or resent.
        if let Err(e) = self.mailer.send_verification_code(&user.email, &code).await {
            error!(error = ?e, user_id = %user.id, "failed to send verification email");
        }
        info!(user_id = %user.id, "verification code issued");

        Ok(VerificationRequestOutput {
            sent: true,
            dev_code: self.expose_dev_tokens.then_some(code),
        })
    }
}

pub struct VerifyEmailInput {
    pub code: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub client: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyEmailOutcome {
    Verified,
    AlreadyVerified,
}

pub struct VerifyEmailUseCase<U: UserRepository, L: RateLimitRepository> {
    pub users: U,
    pub limiter: RateLimiter<L>,
}

impl<U: UserRepository, L: RateLimitRepository> VerifyEmailUseCase<U, L> {
    pub async fn execute(
        &self,
        input: VerifyEmailInput,
        now: DateTime<Utc>,
    ) -> Result<VerifyEmailOutcome, AuthServiceError> {
        let username = input.username.as_deref().filter(|s| !s.is_empty());
        let email = input.email.as_deref().filter(|s| !s.is_empty());
        let subject = username.or(email).unwrap_or_default();
        self.limiter
            .enforce(
                RateLimitScope::Verify,
                &format!("{}:{subject}", input.client),
                now,
            )
            .await?;

        if let Some(user) = self.find_named_account(username, email).await? {
            if user.email_verified {
                return Ok(VerifyEmailOutcome::AlreadyVerified);
            }
        }

        let code = input.code.trim();
        let user = self
            .users
            .find_by_verification_code(code, username, email)
            .await?
            .ok_or(AuthServiceError::InvalidOrExpiredToken)?;
        match user.email_verification_sent_at {
            Some(sent_at) if !one_time_token_expired(sent_at, now) => {}
            _ => return Err(AuthServiceError::ExpiredToken),
        }

        if !self.users.consume_verification_code(user.id, code, now).await? {
            return Err(AuthServiceError::InvalidOrExpiredToken);
        }
        info!(user_id = %user.id, "email verified");
        Ok(VerifyEmailOutcome::Verified)
    }

    async fn find_named_account(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<UserRecord>, AuthServiceError> {
        match (username, email) {
            (Some(username), _) => self.users.find_by_username(username).await,
            (None, Some(email)) => self.users.find_by_email(email).await,
            (None, None) => Ok(None),
        }
    }
}
