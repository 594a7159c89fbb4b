use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gada_auth_types::cookie::{
    GADA_REFRESH_TOKEN, clear_refresh_token_cookie, set_refresh_token_cookie,
};
use gada_core::serde::to_rfc3339_ms;

use crate::error::AuthServiceError;
use crate::handlers::client::ClientIdentifier;
use crate::state::AppState;
use crate::usecase::session::{
    LoginInput, LoginUseCase, LogoutUseCase, RefreshUseCase, TokenPair,
};

/// Body returned by login and refresh. The refresh token only travels in the cookie.
#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
}

fn respond_with_tokens(
    state: &AppState,
    jar: CookieJar,
    tokens: TokenPair,
) -> (CookieJar, Json<AccessTokenResponse>) {
    let jar = set_refresh_token_cookie(jar, tokens.refresh_token, &state.cookies);
    let body = AccessTokenResponse {
        access_token: tokens.access_token,
        token_type: "bearer",
        expires_at: tokens.access_token_expires_at,
    };
    (jar, Json(body))
}

// ── POST /auth/token ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    ClientIdentifier(client): ClientIdentifier,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = LoginUseCase {
        users: state.user_repo(),
        ledger: state.refresh_ledger(),
        limiter: state.rate_limiter(),
        hasher: state.hasher.clone(),
        jwt_secret: state.jwt_secret(),
    };

    let out = usecase
        .execute(
            LoginInput {
                username: body.username,
                password: body.password,
                client,
            },
            Utc::now(),
        )
        .await?;

    Ok(respond_with_tokens(&state, jar, out.tokens))
}

// ── PATCH /auth/token ─────────────────────────────────────────────────────────

pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthServiceError> {
    let raw = jar
        .get(GADA_REFRESH_TOKEN)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or(AuthServiceError::InvalidRefreshToken)?;

    let usecase = RefreshUseCase {
        users: state.user_repo(),
        ledger: state.refresh_ledger(),
        jwt_secret: state.jwt_secret(),
    };
    let tokens = usecase.execute(&raw, Utc::now()).await?;

    Ok(respond_with_tokens(&state, jar, tokens))
}

// ── DELETE /auth/token ────────────────────────────────────────────────────────

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let usecase = LogoutUseCase {
        ledger: state.refresh_ledger(),
    };
    usecase
        .execute(jar.get(GADA_REFRESH_TOKEN).map(|c| c.value()))
        .await;

    let jar = clear_refresh_token_cookie(jar, &state.cookies);
    (StatusCode::NO_CONTENT, jar)
}
