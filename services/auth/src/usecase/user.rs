use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use gada_core::serde::to_rfc3339_ms;
use gada_domain::password::check_password_strength;
use gada_domain::user::UserRole;

use crate::domain::repository::UserRepository;
use crate::domain::types::{NewUser, UserRecord};
use crate::error::AuthServiceError;
use crate::usecase::password::PasswordHasher;

/// Public view of an account. Never carries hashes or one-time tokens.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub approved: bool,
    pub email_verified: bool,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserProfile {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            approved: user.approved,
            email_verified: user.email_verified,
            created_at: user.created_at,
        }
    }
}

pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

fn validate_account_fields(username: &str, email: &str) -> Result<(), AuthServiceError> {
    if username.is_empty() {
        return Err(AuthServiceError::InvalidRequest("username is required"));
    }
    if email.is_empty() {
        return Err(AuthServiceError::InvalidRequest("email is required"));
    }
    if !email.contains('@') {
        return Err(AuthServiceError::InvalidRequest("email is invalid"));
    }
    Ok(())
}

// ── Register ─────────────────────────────────────────────────────────────────

pub struct RegisterUseCase<U: UserRepository> {
    pub users: U,
    pub hasher: PasswordHasher,
}

impl<U: UserRepository> RegisterUseCase<U> {
    /// Admins start approved; everyone else waits for an admin. Nobody starts verified.
    pub async fn execute(
        &self,
        input: RegisterInput,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, AuthServiceError> {
        let username = input.username.trim();
        let email = input.email.trim();
        validate_account_fields(username, email)?;
        check_password_strength(&input.password).map_err(AuthServiceError::WeakPassword)?;

        let user = NewUser {
            id: Uuid::now_v7(),
            username: username.to_owned(),
            email: email.to_owned(),
            password_hash: self.hasher.hash(&input.password).await?,
            role: input.role,
            approved: input.role.is_auto_approved(),
            email_verified: false,
            created_at: now,
        };
        self.users.create(&user).await?;
        info!(user_id = %user.id, role = user.role.as_str(), "user registered");

        Ok(UserProfile {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            approved: user.approved,
            email_verified: user.email_verified,
            created_at: now,
        })
    }
}

// ── Approve ──────────────────────────────────────────────────────────────────

pub struct ApproveUserUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> ApproveUserUseCase<U> {
    pub async fn execute(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), AuthServiceError> {
        if !self.users.approve(user_id, now).await? {
            return Err(AuthServiceError::UserNotFound);
        }
        info!(%user_id, "user approved");
        Ok(())
    }
}

// ── Current user ─────────────────────────────────────────────────────────────

pub struct GetUserUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> GetUserUseCase<U> {
    pub async fn execute(&self, user_id: Uuid) -> Result<UserProfile, AuthServiceError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(UserProfile::from)
            .ok_or(AuthServiceError::UserNotFound)
    }
}

// ── Seed admin ───────────────────────────────────────────────────────────────

pub struct SeedAdminUseCase<U: UserRepository> {
    pub users: U,
    pub hasher: PasswordHasher,
}

impl<U: UserRepository> SeedAdminUseCase<U> {
    /// Create the admin, or reset an existing account of that name to an approved,
    /// verified admin with the given email and password.
    pub async fn execute(
        &self,
        username: &str,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthServiceError> {
        let username = username.trim();
        let email = email.trim();
        validate_account_fields(username, email)?;
        check_password_strength(password).map_err(AuthServiceError::WeakPassword)?;

        let admin = NewUser {
            id: Uuid::now_v7(),
            username: username.to_owned(),
            email: email.to_owned(),
            password_hash: self.hasher.hash(password).await?,
            role: UserRole::Admin,
            approved: true,
            email_verified: true,
            created_at: now,
        };
        self.users.upsert_admin(&admin).await?;
        info!(username, "admin seeded");
        Ok(())
    }
}
