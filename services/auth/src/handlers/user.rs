use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use gada_auth_types::identity::{AdminIdentity, Identity};
use gada_domain::user::UserRole;

use crate::error::AuthServiceError;
use crate::state::AppState;
use crate::usecase::user::{ApproveUserUseCase, GetUserUseCase, RegisterInput, RegisterUseCase};

// ── POST /auth/register ───────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Self-registration always creates a plain user; admins come from `seed-admin`.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = RegisterUseCase {
        users: state.user_repo(),
        hasher: state.hasher.clone(),
    };
    let profile = usecase
        .execute(
            RegisterInput {
                username: body.username,
                email: body.email,
                password: body.password,
                role: UserRole::User,
            },
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

// ── GET /users/me ─────────────────────────────────────────────────────────────

pub async fn get_me(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = GetUserUseCase {
        users: state.user_repo(),
    };
    Ok(Json(usecase.execute(identity.user_id).await?))
}

// ── POST /admin/users/{id}/approve ────────────────────────────────────────────

pub async fn approve_user(
    State(state): State<AppState>,
    AdminIdentity(_admin): AdminIdentity,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = ApproveUserUseCase {
        users: state.user_repo(),
    };
    usecase.execute(user_id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}
