use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::error::AuthServiceError;
use crate::handlers::client::ClientIdentifier;
use crate::state::AppState;
use crate::usecase::password_reset::{PerformPasswordResetUseCase, RequestPasswordResetUseCase};

// ── POST /auth/password/reset-request ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

pub async fn request_reset(
    State(state): State<AppState>,
    ClientIdentifier(client): ClientIdentifier,
    Json(body): Json<ResetRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = RequestPasswordResetUseCase {
        users: state.user_repo(),
        limiter: state.rate_limiter(),
        mailer: state.mailer.clone(),
        expose_dev_tokens: state.expose_dev_tokens,
    };
    let ack = usecase
        .execute(body.email.trim(), &client, Utc::now())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(ack)))
}

// ── POST /auth/password/reset ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PerformResetRequest {
    pub token: String,
    pub new_password: String,
}

pub async fn perform_reset(
    State(state): State<AppState>,
    Json(body): Json<PerformResetRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = PerformPasswordResetUseCase {
        users: state.user_repo(),
        ledger: state.refresh_ledger(),
        hasher: state.hasher.clone(),
    };
    usecase
        .execute(&body.token, &body.new_password, Utc::now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
