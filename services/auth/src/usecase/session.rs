//! Login, refresh and logout.

use chrono::{DateTime, Utc};
use tracing::{error, info};

use gada_auth_types::identity::Identity;
use gada_auth_types::token::issue_access_token;

use crate::domain::repository::{RateLimitRepository, RefreshTokenRepository, UserRepository};
use crate::domain::types::RateLimitScope;
use crate::error::AuthServiceError;
use crate::usecase::password::PasswordHasher;
use crate::usecase::rate_limit::RateLimiter;
use crate::usecase::token::RefreshLedger;

/// Access token plus the raw refresh token that replaces the caller's cookie.
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
}

pub(crate) fn sign_access_token(
    identity: &Identity,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<(String, DateTime<Utc>), AuthServiceError> {
    issue_access_token(identity, secret, now)
        .map_err(|e| AuthServiceError::Internal(anyhow::Error::new(e).context("sign access token")))
}

// ── Login ────────────────────────────────────────────────────────────────────

pub struct LoginInput {
    pub username: String,
    pub password: String,
    /// Network identity of the caller (client address), used for throttling.
    pub client: String,
}

#[derive(Debug)]
pub struct LoginOutput {
    pub identity: Identity,
    pub tokens: TokenPair,
}

pub struct LoginUseCase<U: UserRepository, R: RefreshTokenRepository, L: RateLimitRepository> {
    pub users: U,
    pub ledger: RefreshLedger<R>,
    pub limiter: RateLimiter<L>,
    pub hasher: PasswordHasher,
    pub jwt_secret: String,
}

impl<U, R, L> LoginUseCase<U, R, L>
where
    U: UserRepository,
    R: RefreshTokenRepository,
    L: RateLimitRepository,
{
    /// Checks run in a fixed order and the first failure wins: throttle,
    /// credentials, approval, email verification.
    pub async fn execute(
        &self,
        input: LoginInput,
        now: DateTime<Utc>,
    ) -> Result<LoginOutput, AuthServiceError> {
        self.limiter
            .enforce(
                RateLimitScope::Login,
                &format!("{}:{}", input.client, input.username),
                now,
            )
            .await?;

        // Unknown user and wrong password must be indistinguishable.
        let user = self
            .users
            .find_by_username(&input.username)
            .await?
            .ok_or(AuthServiceError::InvalidCredentials)?;
        if !self
            .hasher
            .verify(&input.password, &user.password_hash)
            .await?
        {
            return Err(AuthServiceError::InvalidCredentials);
        }

        if !user.approved {
            return Err(AuthServiceError::AccountNotApproved);
        }
        if !user.email_verified {
            return Err(AuthServiceError::EmailNotVerified);
        }

        let identity = user.identity();
        let (access_token, access_token_expires_at) =
            sign_access_token(&identity, &self.jwt_secret, now)?;
        let refresh_token = self.ledger.issue(user.id, now).await?;

        info!(user_id = %user.id, "login succeeded");
        Ok(LoginOutput {
            identity,
            tokens: TokenPair {
                access_token,
                access_token_expires_at,
                refresh_token,
            },
        })
    }
}

// ── Refresh ──────────────────────────────────────────────────────────────────

pub struct RefreshUseCase<U: UserRepository, R: RefreshTokenRepository> {
    pub users: U,
    pub ledger: RefreshLedger<R>,
    pub jwt_secret: String,
}

impl<U: UserRepository, R: RefreshTokenRepository> RefreshUseCase<U, R> {
    /// Redeem `raw_refresh_token`, rotating it, and sign a fresh access token.
    pub async fn execute(
        &self,
        raw_refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthServiceError> {
        let (user_id, refresh_token) = self.ledger.rotate(raw_refresh_token, now).await?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthServiceError::InvalidRefreshToken)?;
        let (access_token, access_token_expires_at) =
            sign_access_token(&user.identity(), &self.jwt_secret, now)?;

        Ok(TokenPair {
            access_token,
            access_token_expires_at,
            refresh_token,
        })
    }
}

// ── Logout ───────────────────────────────────────────────────────────────────

pub struct LogoutUseCase<R: RefreshTokenRepository> {
    pub ledger: RefreshLedger<R>,
}

impl<R: RefreshTokenRepository> LogoutUseCase<R> {
    /// Revoke the presented token, if any. Unknown and already-revoked tokens are fine.
    ///
    /// Logout never fails: a store error is logged and the token is left for the
    /// sweeper once it expires.
    pub async fn execute(&self, raw_refresh_token: Option<&str>) {
        let Some(raw) = raw_refresh_token.filter(|raw| !raw.is_empty()) else {
            return;
        };
        if let Err(e) = self.ledger.revoke(raw).await {
            error!(error = ?e, "failed to revoke refresh token on logout");
        }
    }
}
