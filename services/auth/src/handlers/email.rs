use axum::{Json, body::Bytes, extract::State, response::IntoResponse};
use chrono::Utc;
use serde::Deserialize;

use gada_auth_types::identity::Caller;

use crate::error::AuthServiceError;
use crate::handlers::client::ClientIdentifier;
use crate::state::AppState;
use crate::usecase::verification::{
    RequestVerificationUseCase, VerifyEmailInput, VerifyEmailUseCase,
};

// ── POST /auth/email/verification ─────────────────────────────────────────────

/// Credentials for callers that cannot hold an access token yet.
#[derive(Deserialize)]
pub struct VerificationCredentials {
    pub username: String,
    pub password: String,
}

/// Bearer callers send no body; everyone else identifies with username and password.
pub async fn request_verification(
    State(state): State<AppState>,
    caller: Caller,
    ClientIdentifier(client): ClientIdentifier,
    body: Bytes,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = RequestVerificationUseCase {
        users: state.user_repo(),
        limiter: state.rate_limiter(),
        mailer: state.mailer.clone(),
        hasher: state.hasher.clone(),
        expose_dev_tokens: state.expose_dev_tokens,
    };
    let now = Utc::now();

    let out = match caller {
        Caller::Identity(identity) => usecase.execute(identity.user_id, &client, now).await?,
        Caller::Anonymous => {
            let creds: VerificationCredentials = serde_json::from_slice(&body)
                .map_err(|_| AuthServiceError::InvalidRequest("username and password are required"))?;
            usecase
                .execute_with_credentials(&creds.username, &creds.password, &client, now)
                .await?
        }
    };
    Ok(Json(out))
}

// ── POST /auth/email/verify ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyEmailRequest {
    pub code: String,
    pub username: Option<String>,
    pub email: Option<String>,
}

pub async fn verify_email(
    State(state): State<AppState>,
    ClientIdentifier(client): ClientIdentifier,
    Json(body): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = VerifyEmailUseCase {
        users: state.user_repo(),
        limiter: state.rate_limiter(),
    };
    let outcome = usecase
        .execute(
            VerifyEmailInput {
                code: body.code,
                username: body.username,
                email: body.email,
                client,
            },
            Utc::now(),
        )
        .await?;
    Ok(Json(serde_json::json!({ "status": outcome })))
}
