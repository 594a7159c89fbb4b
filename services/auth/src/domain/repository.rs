#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::types::{
    NewUser, RateLimitDecision, RateLimitPolicy, RateLimitScope, RefreshTokenRecord, UserRecord,
};
use crate::error::AuthServiceError;

/// Credential store. Owns the user rows, including the one-time token columns.
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, AuthServiceError>;

    async fn find_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, AuthServiceError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthServiceError>;

    /// Insert a user. Fails with `UserAlreadyExists` when username or email is taken.
    async fn create(&self, user: &NewUser) -> Result<(), AuthServiceError>;

    /// Set `approved = true`. Returns `false` if the user does not exist.
    async fn approve(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, AuthServiceError>;

    /// Create the admin, or promote and reset the existing account with that username.
    async fn upsert_admin(&self, user: &NewUser) -> Result<(), AuthServiceError>;

    /// Store a fresh verification code, replacing any previous one.
    async fn set_verification_code(
        &self,
        id: Uuid,
        code: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), AuthServiceError>;

    /// Find the account holding `code`, narrowed by username and/or email when given.
    async fn find_by_verification_code(
        &self,
        code: &str,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<UserRecord>, AuthServiceError>;

    /// Mark the email verified and clear the code, only if `code` is still the stored one.
    /// Returns `false` when another request consumed it first.
    async fn consume_verification_code(
        &self,
        id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError>;

    /// Store a reset-token digest, replacing any previous one.
    async fn set_password_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), AuthServiceError>;

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserRecord>, AuthServiceError>;

    /// Replace the password hash and clear the reset token, only if `token_hash` is
    /// still the stored one. Returns `false` when another request consumed it first.
    async fn consume_password_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError>;
}

/// Refresh-token ledger. Stores digests only, never raw tokens.
pub trait RefreshTokenRepository: Send + Sync {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AuthServiceError>;

    /// Atomically revoke the live row matching `presented_hash` and insert `replacement`
    /// for the same user. `replacement.user_id` is ignored and taken from the revoked row.
    ///
    /// Returns the owning user id, or `None` when the token is unknown, revoked or
    /// expired. Of several concurrent calls with the same hash at most one succeeds.
    async fn rotate(
        &self,
        presented_hash: &str,
        now: DateTime<Utc>,
        replacement: &RefreshTokenRecord,
    ) -> Result<Option<Uuid>, AuthServiceError>;

    /// Mark the row revoked. No error when absent or already revoked.
    async fn revoke(&self, token_hash: &str) -> Result<(), AuthServiceError>;

    /// Revoke every live token of a user. Returns how many rows changed.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AuthServiceError>;

    /// Delete up to `limit` rows that are revoked or expired at `now`.
    async fn sweep(&self, now: DateTime<Utc>, limit: u64) -> Result<u64, AuthServiceError>;
}

/// Durable fixed-window counters keyed by (scope, identifier).
pub trait RateLimitRepository: Send + Sync {
    /// Check and count one event in a single atomic step.
    async fn hit(
        &self,
        scope: RateLimitScope,
        identifier: &str,
        policy: RateLimitPolicy,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, AuthServiceError>;
}

/// Outbound email. Delivery failures are reported but never fail the calling flow.
pub trait Mailer: Send + Sync {
    async fn send_verification_code(&self, to: &str, code: &str) -> anyhow::Result<()>;

    async fn send_password_reset(&self, to: &str, token: &str) -> anyhow::Result<()>;
}
