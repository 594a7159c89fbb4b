use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use gada_domain::password::PasswordRule;

use crate::domain::types::RateLimitScope;

/// Auth service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("incorrect username or password")]
    InvalidCredentials,
    #[error("account not yet approved")]
    AccountNotApproved,
    #[error("email not verified")]
    EmailNotVerified,
    #[error("too many {scope} attempts, try again later")]
    RateLimited { scope: RateLimitScope },
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("token expired, request a new one")]
    ExpiredToken,
    #[error("password too weak")]
    WeakPassword(Vec<PasswordRule>),
    #[error("username or email already registered")]
    UserAlreadyExists,
    #[error("user not found")]
    UserNotFound,
    #[error("{0}")]
    InvalidRequest(&'static str),
    #[error("service temporarily unavailable")]
    TransientStoreFailure(#[source] anyhow::Error),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountNotApproved => "ACCOUNT_NOT_APPROVED",
            Self::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            Self::InvalidOrExpiredToken => "INVALID_OR_EXPIRED_TOKEN",
            Self::ExpiredToken => "EXPIRED_TOKEN",
            Self::WeakPassword(_) => "WEAK_PASSWORD",
            Self::UserAlreadyExists => "USER_ALREADY_EXISTS",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::TransientStoreFailure(_) => "TRANSIENT_STORE_FAILURE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            Self::AccountNotApproved | Self::EmailNotVerified => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidOrExpiredToken | Self::WeakPassword(_) | Self::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::ExpiredToken => StatusCode::GONE,
            Self::UserAlreadyExists => StatusCode::CONFLICT,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::TransientStoreFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        // TraceLayer already records every response status; only server-side
        // failures carry a cause chain worth logging here.
        match &self {
            Self::Internal(e) => tracing::error!(error = ?e, kind = self.kind(), "internal error"),
            Self::TransientStoreFailure(e) => {
                tracing::error!(error = ?e, kind = self.kind(), "store unavailable")
            }
            _ => {}
        }
        let mut body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let Self::WeakPassword(missing) = &self {
            body["missing"] = serde_json::json!(missing);
        }
        (status, axum::Json(body)).into_response()
    }
}
