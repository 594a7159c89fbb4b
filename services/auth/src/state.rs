use axum::extract::FromRef;
use sea_orm::DatabaseConnection;

use gada_auth_types::cookie::CookieSettings;
use gada_auth_types::identity::AccessTokenSecret;

use crate::handlers::client::ClientAddressPolicy;
use crate::infra::db::{DbRateLimitRepository, DbRefreshTokenRepository, DbUserRepository};
use crate::infra::mailer::LogMailer;
use crate::usecase::password::PasswordHasher;
use crate::usecase::rate_limit::RateLimiter;
use crate::usecase::token::RefreshLedger;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub access_secret: AccessTokenSecret,
    pub cookies: CookieSettings,
    pub mailer: LogMailer,
    pub hasher: PasswordHasher,
    pub expose_dev_tokens: bool,
    pub client_policy: ClientAddressPolicy,
}

impl FromRef<AppState> for AccessTokenSecret {
    fn from_ref(state: &AppState) -> Self {
        state.access_secret.clone()
    }
}

impl FromRef<AppState> for ClientAddressPolicy {
    fn from_ref(state: &AppState) -> Self {
        state.client_policy
    }
}

impl AppState {
    pub fn jwt_secret(&self) -> String {
        self.access_secret.expose().to_owned()
    }

    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn refresh_ledger(&self) -> RefreshLedger<DbRefreshTokenRepository> {
        RefreshLedger {
            tokens: DbRefreshTokenRepository {
                db: self.db.clone(),
            },
        }
    }

    pub fn rate_limiter(&self) -> RateLimiter<DbRateLimitRepository> {
        RateLimiter {
            limits: DbRateLimitRepository {
                db: self.db.clone(),
            },
        }
    }
}
