//! Mock auth helpers for integration tests.
//!
//! `MockAuth` signs real access tokens with a test secret, so requests go
//! through the same bearer extractors as production traffic.

use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use chrono::Utc;
use uuid::Uuid;

use gada_auth_types::identity::Identity;
use gada_auth_types::token::issue_access_token;
use gada_domain::user::UserRole;

/// Secret shared by tests that build an app state and mint tokens for it.
pub const TEST_JWT_SECRET: &str = "gada-test-secret";

/// Configurable identity injected into test requests.
pub struct MockAuth {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl MockAuth {
    pub fn new(user_id: Uuid, username: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }

    pub fn user(username: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4(), username, UserRole::User)
    }

    pub fn admin(username: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4(), username, UserRole::Admin)
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            username: self.username.clone(),
            role: self.role,
        }
    }

    /// Sign an access token valid for the default TTL from now.
    pub fn bearer_token(&self, secret: &str) -> String {
        let (token, _) = issue_access_token(&self.identity(), secret, Utc::now())
            .unwrap_or_else(|e| panic!("failed to sign test token: {e}"));
        token
    }

    /// `Authorization: Bearer ...` value for [`TEST_JWT_SECRET`].
    pub fn authorization(&self) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", self.bearer_token(TEST_JWT_SECRET)))
            .unwrap_or_else(|e| panic!("invalid header value: {e}"))
    }

    pub fn headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(AUTHORIZATION, self.authorization());
        map
    }
}
