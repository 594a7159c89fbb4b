use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use gada_auth_types::identity::Identity;
use gada_domain::user::UserRole;

/// Credential record as read from the user store.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub approved: bool,
    pub email_verified: bool,
    pub email_verification_token: Option<String>,
    pub email_verification_sent_at: Option<DateTime<Utc>>,
    /// SHA-256 hex digest of the raw reset token.
    pub password_reset_token: Option<String>,
    pub password_reset_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub approved: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Refresh-token ledger row.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }

    /// Eligible for deletion by the sweeper.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.revoked || self.expires_at <= now
    }
}

// ── Rate limiting ────────────────────────────────────────────────────────────

/// Category of throttled action, independent of the HTTP route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitScope {
    Login,
    Verify,
    Reset,
}

impl RateLimitScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Verify => "verify",
            Self::Reset => "reset",
        }
    }

    pub fn policy(self) -> RateLimitPolicy {
        match self {
            Self::Login => LOGIN_POLICY,
            Self::Verify => VERIFY_POLICY,
            Self::Reset => RESET_POLICY,
        }
    }
}

impl fmt::Display for RateLimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `max` events per fixed window of `window_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max: i32,
    pub window_secs: i64,
}

pub const LOGIN_POLICY: RateLimitPolicy = RateLimitPolicy {
    max: 5,
    window_secs: 60,
};
pub const VERIFY_POLICY: RateLimitPolicy = RateLimitPolicy {
    max: 6,
    window_secs: 3600,
};
pub const RESET_POLICY: RateLimitPolicy = RateLimitPolicy {
    max: 3,
    window_secs: 3600,
};

/// Current counter state for one (scope, identifier) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitWindow {
    pub window_start: DateTime<Utc>,
    pub count: i32,
}

/// What to do with the stored window for one incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStep {
    /// Window is current and full.
    Deny,
    /// No window or the previous one elapsed: reset to `count = 1` at `now`.
    Start,
    /// Window is current with room left: `count += 1`.
    Increment,
}

impl RateLimitPolicy {
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs)
    }

    pub fn step(&self, existing: Option<&RateLimitWindow>, now: DateTime<Utc>) -> WindowStep {
        match existing {
            Some(w) if now - w.window_start < self.window() => {
                if w.count >= self.max {
                    WindowStep::Deny
                } else {
                    WindowStep::Increment
                }
            }
            _ => WindowStep::Start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

// ── One-time tokens ──────────────────────────────────────────────────────────

/// Validity window of email-verification codes and password-reset tokens.
pub const ONE_TIME_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Whether a one-time token sent at `sent_at` has expired at `now`.
pub fn one_time_token_expired(sent_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= sent_at + Duration::seconds(ONE_TIME_TOKEN_TTL_SECS)
}
