//! Refresh-token ledger and one-time secret generation.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngExt;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use gada_auth_types::cookie::REFRESH_TOKEN_TTL_SECS;

use crate::domain::repository::RefreshTokenRepository;
use crate::domain::types::RefreshTokenRecord;
use crate::error::AuthServiceError;

/// 256 bits of randomness, base64url without padding (43 chars).
pub fn generate_opaque_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Six-digit numeric email verification code.
pub fn generate_verification_code() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

/// Lowercase hex SHA-256 digest, the only form in which opaque tokens are stored.
pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

fn new_record(user_id: Uuid, raw: &str, now: DateTime<Utc>) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id: Uuid::now_v7(),
        user_id,
        token_hash: hash_token(raw),
        expires_at: now + Duration::seconds(REFRESH_TOKEN_TTL_SECS),
        revoked: false,
        created_at: now,
    }
}

pub struct RefreshLedger<R: RefreshTokenRepository> {
    pub tokens: R,
}

impl<R: RefreshTokenRepository> RefreshLedger<R> {
    /// Store a new token for `user_id` and return its raw value.
    pub async fn issue(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, AuthServiceError> {
        let raw = generate_opaque_token();
        self.tokens.insert(&new_record(user_id, &raw, now)).await?;
        Ok(raw)
    }

    /// Redeem `raw` and replace it with a fresh token in one step.
    ///
    /// Returns the owning user and the successor's raw value. Absent, revoked and
    /// expired tokens are indistinguishable to the caller.
    pub async fn rotate(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<(Uuid, String), AuthServiceError> {
        let successor = generate_opaque_token();
        // user_id is filled in by the store from the redeemed row.
        let replacement = new_record(Uuid::nil(), &successor, now);
        let user_id = self
            .tokens
            .rotate(&hash_token(raw), now, &replacement)
            .await?
            .ok_or(AuthServiceError::InvalidRefreshToken)?;
        Ok((user_id, successor))
    }

    pub async fn revoke(&self, raw: &str) -> Result<(), AuthServiceError> {
        self.tokens.revoke(&hash_token(raw)).await
    }

    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AuthServiceError> {
        self.tokens.revoke_all_for_user(user_id).await
    }

    pub async fn sweep(&self, now: DateTime<Utc>, batch_limit: u64) -> Result<u64, AuthServiceError> {
        self.tokens.sweep(now, batch_limit).await
    }
}
