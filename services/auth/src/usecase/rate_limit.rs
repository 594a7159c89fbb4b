use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::repository::RateLimitRepository;
use crate::domain::types::{RateLimitDecision, RateLimitScope};
use crate::error::AuthServiceError;

/// Fixed-window limiter over a shared store.
pub struct RateLimiter<L: RateLimitRepository> {
    pub limits: L,
}

impl<L: RateLimitRepository> RateLimiter<L> {
    pub async fn check_and_increment(
        &self,
        scope: RateLimitScope,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, AuthServiceError> {
        self.limits.hit(scope, identifier, scope.policy(), now).await
    }

    /// Like [`check_and_increment`](Self::check_and_increment), but a denial is an error.
    pub async fn enforce(
        &self,
        scope: RateLimitScope,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthServiceError> {
        match self.check_and_increment(scope, identifier, now).await? {
            RateLimitDecision::Allowed => Ok(()),
            RateLimitDecision::Limited => {
                warn!(scope = scope.as_str(), "rate limit exceeded");
                Err(AuthServiceError::RateLimited { scope })
            }
        }
    }
}
