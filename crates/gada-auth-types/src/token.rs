//! JWT access-token codec.
//!
//! Access tokens are stateless: there is no server-side revocation, the short
//! [`ACCESS_TOKEN_TTL_SECS`] lifetime is the only bound on a leaked token.

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
#[cfg(any(feature = "USE_ONLY_IN_AUTH_SERVICE", test))]
use serde::Serialize;
use uuid::Uuid;

use gada_domain::user::UserRole;

use crate::identity::Identity;

/// Access-token JWT lifetime in seconds (15 minutes).
pub const ACCESS_TOKEN_TTL_SECS: i64 = 900;

/// Errors returned by [`validate_access_token`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

/// JWT claims payload shared by token creation (auth service) and validation.
///
/// # Fields
///
/// | Field | JWT claim | Rust type | Meaning |
/// |-------|-----------|-----------|---------|
/// | `sub` | `sub` | UUID string | user ID |
/// | `username` | custom | `String` | login name at issue time |
/// | `role` | custom | [`UserRole`] | `"user"` or `"admin"` |
/// | `exp` | `exp` | seconds since epoch | token expiration |
/// | `jti` | `jti` | UUID string | unique per issued token |
///
/// # Feature gate
///
/// [`Deserialize`] is always available — all consumers validate tokens.
/// [`Serialize`] requires the **`USE_ONLY_IN_AUTH_SERVICE`** cargo feature. Only the auth
/// service enables it because it is the sole token issuer.
#[derive(Debug, Deserialize)]
#[cfg_attr(any(feature = "USE_ONLY_IN_AUTH_SERVICE", test), derive(Serialize))]
pub struct AccessClaims {
    pub sub: String,
    pub username: String,
    pub role: UserRole,
    pub exp: i64,
    pub jti: String,
}

/// Decode a JWT and check its expiry against `now`.
///
/// Signature and structure are checked by `jsonwebtoken` (HS256, `exp` and `sub`
/// required); expiry is checked here so callers control the clock. A token is
/// expired once `now >= exp`, no leeway.
fn decode_jwt(token: &str, secret: &str, now: DateTime<Utc>) -> Result<AccessClaims, AuthError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::Malformed,
    })?;

    if now.timestamp() >= data.claims.exp {
        return Err(AuthError::Expired);
    }
    Ok(data.claims)
}

/// Validate a bearer access token, returning the identity it carries.
pub fn validate_access_token(
    token: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<Identity, AuthError> {
    let claims = decode_jwt(token, secret, now)?;
    let user_id = claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| AuthError::Malformed)?;
    Ok(Identity {
        user_id,
        username: claims.username,
        role: claims.role,
    })
}

/// Sign a new access token for `identity`, expiring [`ACCESS_TOKEN_TTL_SECS`] after `now`.
///
/// Returns the encoded token and its absolute expiry.
#[cfg(any(feature = "USE_ONLY_IN_AUTH_SERVICE", test))]
pub fn issue_access_token(
    identity: &Identity,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<(String, DateTime<Utc>), jsonwebtoken::errors::Error> {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let expires_at = now + chrono::Duration::seconds(ACCESS_TOKEN_TTL_SECS);
    let claims = AccessClaims {
        sub: identity.user_id.to_string(),
        username: identity.username.clone(),
        role: identity.role,
        exp: expires_at.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, expires_at))
}
