//! Password reset with opaque single-use tokens.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use gada_domain::password::check_password_strength;

use crate::domain::repository::{Mailer, RateLimitRepository, RefreshTokenRepository, UserRepository};
use crate::domain::types::{RateLimitScope, one_time_token_expired};
use crate::error::AuthServiceError;
use crate::usecase::password::PasswordHasher;
use crate::usecase::rate_limit::RateLimiter;
use crate::usecase::token::{RefreshLedger, generate_opaque_token, hash_token};

pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent.";

/// Identical shape whether or not the email belongs to an account.
#[derive(Debug, Serialize)]
pub struct PasswordResetAck {
    pub message: &'static str,
    /// Raw reset token, only when dev-token exposure is enabled. Always present as a key.
    pub token: Option<String>,
}

pub struct RequestPasswordResetUseCase<U: UserRepository, L: RateLimitRepository, M: Mailer> {
    pub users: U,
    pub limiter: RateLimiter<L>,
    pub mailer: M,
    pub expose_dev_tokens: bool,
}

impl<U, L, M> RequestPasswordResetUseCase<U, L, M>
where
    U: UserRepository,
    L: RateLimitRepository,
    M: Mailer,
{
    pub async fn execute(
        &self,
        email: &str,
        client: &str,
        now: DateTime<Utc>,
    ) -> Result<PasswordResetAck, AuthServiceError> {
        self.limiter
            .enforce(RateLimitScope::Reset, &format!("{client}:{email}"), now)
            .await?;

        let Some(user) = self.users.find_by_email(email).await? else {
            return Ok(PasswordResetAck {
                message: RESET_REQUESTED_MESSAGE,
                token: None,
            });
        };

        let token = generate_opaque_token();
        self.users
            .set_password_reset(user.id, &hash_token(&token), now)
            .await?;
        if let Err(e) = self.mailer.send_password_reset(&user.email, &token).await {
            error!(error = ?e, user_id = %user.id, "failed to send password reset email");
        }
        info!(user_id = %user.id, "password reset token issued");

        Ok(PasswordResetAck {
            message: RESET_REQUESTED_MESSAGE,
            token: self.expose_dev_tokens.then_some(token),
        })
    }
}

pub struct PerformPasswordResetUseCase<U: UserRepository, R: RefreshTokenRepository> {
    pub users: U,
    pub ledger: RefreshLedger<R>,
    pub hasher: PasswordHasher,
}

impl<U: UserRepository, R: RefreshTokenRepository> PerformPasswordResetUseCase<U, R> {
    /// Set a new password and sign out every session of the account.
    pub async fn execute(
        &self,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthServiceError> {
        check_password_strength(new_password).map_err(AuthServiceError::WeakPassword)?;

        let token_hash = hash_token(token.trim());
        let user = self
            .users
            .find_by_reset_token(&token_hash)
            .await?
            .ok_or(AuthServiceError::InvalidOrExpiredToken)?;
        match user.password_reset_sent_at {
            Some(sent_at) if !one_time_token_expired(sent_at, now) => {}
            _ => return Err(AuthServiceError::ExpiredToken),
        }

        let password_hash = self.hasher.hash(new_password).await?;
        if !self
            .users
            .consume_password_reset(user.id, &token_hash, &password_hash, now)
            .await?
        {
            return Err(AuthServiceError::InvalidOrExpiredToken);
        }

        let revoked = self.ledger.revoke_all(user.id).await?;
        info!(user_id = %user.id, revoked_sessions = revoked, "password reset");
        Ok(())
    }
}
