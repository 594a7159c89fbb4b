//! Bearer-token identity extractors.
//!
//! Handlers that need a logged-in user take [`Identity`]; handlers that behave
//! differently for anonymous callers take [`Caller`]; admin-only handlers take
//! [`AdminIdentity`]. All three read `Authorization: Bearer <jwt>` and validate
//! it with the [`AccessTokenSecret`] found in router state.

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use chrono::Utc;
use http::header::AUTHORIZATION;
use http::request::Parts;
use uuid::Uuid;

use gada_core::error::AppError;
use gada_domain::user::UserRole;

use crate::token::validate_access_token;

/// Authenticated caller, as carried by a valid access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Either an authenticated identity or nobody.
///
/// A missing, malformed or expired bearer token yields `Anonymous`; it never
/// rejects the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Identity(Identity),
    Anonymous,
}

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Identity(identity) => Some(identity),
            Self::Anonymous => None,
        }
    }
}

/// An [`Identity`] whose role is admin. Rejects with 403 otherwise.
#[derive(Debug, Clone)]
pub struct AdminIdentity(pub Identity);

/// HMAC secret used to verify access tokens. Provide it from router state via `FromRef`.
#[derive(Clone)]
pub struct AccessTokenSecret(Arc<str>);

impl AccessTokenSecret {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessTokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessTokenSecret(<redacted>)")
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn identity_from_parts(parts: &Parts, secret: &AccessTokenSecret) -> Option<Identity> {
    let token = bearer_token(parts)?;
    validate_access_token(token, secret.expose(), Utc::now()).ok()
}

// axum-core 0.5 defines `from_request_parts` as `fn -> impl Future + Send`.
// Extract synchronously, then return a 'static async block.

impl<S> FromRequestParts<S> for Identity
where
    AccessTokenSecret: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let secret = AccessTokenSecret::from_ref(state);
        let identity = identity_from_parts(parts, &secret);
        async move { identity.ok_or(AppError::Unauthorized) }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    AccessTokenSecret: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let secret = AccessTokenSecret::from_ref(state);
        let caller = match identity_from_parts(parts, &secret) {
            Some(identity) => Caller::Identity(identity),
            None => Caller::Anonymous,
        };
        async move { Ok(caller) }
    }
}

impl<S> FromRequestParts<S> for AdminIdentity
where
    AccessTokenSecret: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let secret = AccessTokenSecret::from_ref(state);
        let result = match identity_from_parts(parts, &secret) {
            None => Err(AppError::Unauthorized),
            Some(identity) if !identity.is_admin() => Err(AppError::Forbidden),
            Some(identity) => Ok(AdminIdentity(identity)),
        };
        async move { result }
    }
}
