use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect, SqlErr, TransactionError,
    TransactionTrait,
};
use uuid::Uuid;

use gada_auth_schema::{rate_limits, refresh_tokens, users};
use gada_domain::user::UserRole;

use crate::domain::repository::{RateLimitRepository, RefreshTokenRepository, UserRepository};
use crate::domain::types::{
    NewUser, RateLimitDecision, RateLimitPolicy, RateLimitScope, RateLimitWindow,
    RefreshTokenRecord, UserRecord, WindowStep,
};
use crate::error::AuthServiceError;

// ── Error classification ─────────────────────────────────────────────────────

/// Pool exhaustion and dropped connections are worth retrying; anything else is a bug
/// or a data problem.
pub fn is_transient(err: &DbErr) -> bool {
    matches!(err, DbErr::ConnectionAcquire(_) | DbErr::Conn(_))
}

fn store_error(err: DbErr, what: &'static str) -> AuthServiceError {
    if is_transient(&err) {
        AuthServiceError::TransientStoreFailure(anyhow::Error::new(err).context(what))
    } else {
        AuthServiceError::Internal(anyhow::Error::new(err).context(what))
    }
}

/// `.context(..)` for storage results, keeping transient failures distinguishable.
trait StoreContext<T> {
    fn store_context(self, what: &'static str) -> Result<T, AuthServiceError>;
}

impl<T> StoreContext<T> for Result<T, DbErr> {
    fn store_context(self, what: &'static str) -> Result<T, AuthServiceError> {
        self.map_err(|e| store_error(e, what))
    }
}

impl<T> StoreContext<T> for Result<T, TransactionError<DbErr>> {
    fn store_context(self, what: &'static str) -> Result<T, AuthServiceError> {
        self.map_err(|e| match e {
            TransactionError::Connection(e) | TransactionError::Transaction(e) => {
                store_error(e, what)
            }
        })
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

// ── User repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

impl DbUserRepository {
    async fn find_one(
        &self,
        condition: Condition,
        what: &'static str,
    ) -> Result<Option<UserRecord>, AuthServiceError> {
        users::Entity::find()
            .filter(condition)
            .one(&self.db)
            .await
            .store_context(what)?
            .map(user_from_model)
            .transpose()
    }
}

impl UserRepository for DbUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, AuthServiceError> {
        self.find_one(Condition::all().add(users::Column::Id.eq(id)), "find user by id")
            .await
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, AuthServiceError> {
        self.find_one(
            Condition::all().add(users::Column::Username.eq(username)),
            "find user by username",
        )
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthServiceError> {
        self.find_one(
            Condition::all().add(users::Column::Email.eq(email)),
            "find user by email",
        )
        .await
    }

    async fn create(&self, user: &NewUser) -> Result<(), AuthServiceError> {
        match new_user_model(user).insert(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AuthServiceError::UserAlreadyExists),
            Err(e) => Err(store_error(e, "create user")),
        }
    }

    async fn approve(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, AuthServiceError> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::Approved, Expr::value(true))
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .store_context("approve user")?;
        Ok(result.rows_affected > 0)
    }

    async fn upsert_admin(&self, user: &NewUser) -> Result<(), AuthServiceError> {
        let user = user.clone();
        let result = self
            .db
            .transaction::<_, (), DbErr>(|txn| {
                Box::pin(async move {
                    let existing = users::Entity::find()
                        .filter(users::Column::Username.eq(user.username.as_str()))
                        .one(txn)
                        .await?;
                    match existing {
                        Some(model) => {
                            let mut active: users::ActiveModel = model.into();
                            active.email = Set(user.email);
                            active.password_hash = Set(user.password_hash);
                            active.role = Set(UserRole::Admin.as_str().to_owned());
                            active.approved = Set(true);
                            active.email_verified = Set(true);
                            active.updated_at = Set(user.created_at);
                            active.update(txn).await?;
                        }
                        None => {
                            new_user_model(&user).insert(txn).await?;
                        }
                    }
                    Ok(())
                })
            })
            .await;
        match result {
            Err(TransactionError::Transaction(e)) if is_unique_violation(&e) => {
                Err(AuthServiceError::UserAlreadyExists)
            }
            other => other.store_context("upsert admin"),
        }
    }

    async fn set_verification_code(
        &self,
        id: Uuid,
        code: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), AuthServiceError> {
        users::Entity::update_many()
            .col_expr(users::Column::EmailVerificationToken, Expr::value(code))
            .col_expr(users::Column::EmailVerificationSentAt, Expr::value(sent_at))
            .col_expr(users::Column::UpdatedAt, Expr::value(sent_at))
            .filter(users::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .store_context("set verification code")?;
        Ok(())
    }

    async fn find_by_verification_code(
        &self,
        code: &str,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<UserRecord>, AuthServiceError> {
        let mut condition = Condition::all().add(users::Column::EmailVerificationToken.eq(code));
        if let Some(username) = username {
            condition = condition.add(users::Column::Username.eq(username));
        }
        if let Some(email) = email {
            condition = condition.add(users::Column::Email.eq(email));
        }
        self.find_one(condition, "find user by verification code")
            .await
    }

    async fn consume_verification_code(
        &self,
        id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::EmailVerified, Expr::value(true))
            .col_expr(
                users::Column::EmailVerificationToken,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                users::Column::EmailVerificationSentAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(id))
            .filter(users::Column::EmailVerificationToken.eq(code))
            .exec(&self.db)
            .await
            .store_context("consume verification code")?;
        Ok(result.rows_affected == 1)
    }

    async fn set_password_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), AuthServiceError> {
        users::Entity::update_many()
            .col_expr(users::Column::PasswordResetToken, Expr::value(token_hash))
            .col_expr(users::Column::PasswordResetSentAt, Expr::value(sent_at))
            .col_expr(users::Column::UpdatedAt, Expr::value(sent_at))
            .filter(users::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .store_context("set password reset token")?;
        Ok(())
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserRecord>, AuthServiceError> {
        self.find_one(
            Condition::all().add(users::Column::PasswordResetToken.eq(token_hash)),
            "find user by reset token",
        )
        .await
    }

    async fn consume_password_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(new_password_hash))
            .col_expr(
                users::Column::PasswordResetToken,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                users::Column::PasswordResetSentAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(id))
            .filter(users::Column::PasswordResetToken.eq(token_hash))
            .exec(&self.db)
            .await
            .store_context("consume password reset token")?;
        Ok(result.rows_affected == 1)
    }
}

fn new_user_model(user: &NewUser) -> users::ActiveModel {
    users::ActiveModel {
        id: Set(user.id),
        username: Set(user.username.clone()),
        email: Set(user.email.clone()),
        password_hash: Set(user.password_hash.clone()),
        role: Set(user.role.as_str().to_owned()),
        approved: Set(user.approved),
        email_verified: Set(user.email_verified),
        email_verification_token: Set(None),
        email_verification_sent_at: Set(None),
        password_reset_token: Set(None),
        password_reset_sent_at: Set(None),
        created_at: Set(user.created_at),
        updated_at: Set(user.created_at),
    }
}

fn user_from_model(model: users::Model) -> Result<UserRecord, AuthServiceError> {
    let role = model
        .role
        .parse::<UserRole>()
        .map_err(|e| AuthServiceError::Internal(anyhow::Error::new(e).context("read user role")))?;
    Ok(UserRecord {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        role,
        approved: model.approved,
        email_verified: model.email_verified,
        email_verification_token: model.email_verification_token,
        email_verification_sent_at: model.email_verification_sent_at,
        password_reset_token: model.password_reset_token,
        password_reset_sent_at: model.password_reset_sent_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ── Refresh-token repository ─────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRefreshTokenRepository {
    pub db: DatabaseConnection,
}

impl RefreshTokenRepository for DbRefreshTokenRepository {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AuthServiceError> {
        insert_refresh_token(&self.db, record)
            .await
            .store_context("insert refresh token")
    }

    async fn rotate(
        &self,
        presented_hash: &str,
        now: DateTime<Utc>,
        replacement: &RefreshTokenRecord,
    ) -> Result<Option<Uuid>, AuthServiceError> {
        let presented = presented_hash.to_owned();
        let replacement = replacement.clone();
        self.db
            .transaction::<_, Option<Uuid>, DbErr>(|txn| {
                Box::pin(async move {
                    // Compare-and-swap on `revoked`: only one concurrent caller sees 1 row.
                    let revoked = refresh_tokens::Entity::update_many()
                        .col_expr(refresh_tokens::Column::Revoked, Expr::value(true))
                        .filter(refresh_tokens::Column::TokenHash.eq(presented.as_str()))
                        .filter(refresh_tokens::Column::Revoked.eq(false))
                        .filter(refresh_tokens::Column::ExpiresAt.gt(now))
                        .exec(txn)
                        .await?;
                    if revoked.rows_affected != 1 {
                        return Ok(None);
                    }

                    let Some(row) = refresh_tokens::Entity::find()
                        .filter(refresh_tokens::Column::TokenHash.eq(presented.as_str()))
                        .one(txn)
                        .await?
                    else {
                        return Ok(None);
                    };

                    let successor = RefreshTokenRecord {
                        user_id: row.user_id,
                        ..replacement
                    };
                    insert_refresh_token(txn, &successor).await?;
                    Ok(Some(row.user_id))
                })
            })
            .await
            .store_context("rotate refresh token")
    }

    async fn revoke(&self, token_hash: &str) -> Result<(), AuthServiceError> {
        refresh_tokens::Entity::update_many()
            .col_expr(refresh_tokens::Column::Revoked, Expr::value(true))
            .filter(refresh_tokens::Column::TokenHash.eq(token_hash))
            .exec(&self.db)
            .await
            .store_context("revoke refresh token")?;
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AuthServiceError> {
        let result = refresh_tokens::Entity::update_many()
            .col_expr(refresh_tokens::Column::Revoked, Expr::value(true))
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .filter(refresh_tokens::Column::Revoked.eq(false))
            .exec(&self.db)
            .await
            .store_context("revoke refresh tokens for user")?;
        Ok(result.rows_affected)
    }

    async fn sweep(&self, now: DateTime<Utc>, limit: u64) -> Result<u64, AuthServiceError> {
        let ids: Vec<Uuid> = refresh_tokens::Entity::find()
            .select_only()
            .column(refresh_tokens::Column::Id)
            .filter(
                Condition::any()
                    .add(refresh_tokens::Column::Revoked.eq(true))
                    .add(refresh_tokens::Column::ExpiresAt.lte(now)),
            )
            .limit(limit)
            .into_tuple()
            .all(&self.db)
            .await
            .store_context("select stale refresh tokens")?;
        if ids.is_empty() {
            return Ok(0);
        }

        let result = refresh_tokens::Entity::delete_many()
            .filter(refresh_tokens::Column::Id.is_in(ids))
            .exec(&self.db)
            .await
            .store_context("delete stale refresh tokens")?;
        Ok(result.rows_affected)
    }
}

async fn insert_refresh_token<C: ConnectionTrait>(
    conn: &C,
    record: &RefreshTokenRecord,
) -> Result<(), DbErr> {
    refresh_tokens::ActiveModel {
        id: Set(record.id),
        user_id: Set(record.user_id),
        token_hash: Set(record.token_hash.clone()),
        expires_at: Set(record.expires_at),
        revoked: Set(record.revoked),
        created_at: Set(record.created_at),
    }
    .insert(conn)
    .await?;
    Ok(())
}

// ── Rate-limit repository ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRateLimitRepository {
    pub db: DatabaseConnection,
}

impl RateLimitRepository for DbRateLimitRepository {
    async fn hit(
        &self,
        scope: RateLimitScope,
        identifier: &str,
        policy: RateLimitPolicy,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, AuthServiceError> {
        let identifier = identifier.to_owned();
        self.db
            .transaction::<_, RateLimitDecision, DbErr>(|txn| {
                Box::pin(async move {
                    // Make sure the row exists so the locking read below always has a target.
                    rate_limits::Entity::insert(rate_limits::ActiveModel {
                        id: Set(Uuid::now_v7()),
                        scope: Set(scope.as_str().to_owned()),
                        identifier: Set(identifier.clone()),
                        window_start: Set(now),
                        count: Set(0),
                    })
                    .on_conflict(
                        OnConflict::columns([
                            rate_limits::Column::Scope,
                            rate_limits::Column::Identifier,
                        ])
                        .do_nothing()
                        .to_owned(),
                    )
                    .exec_without_returning(txn)
                    .await?;

                    let row = rate_limits::Entity::find()
                        .filter(rate_limits::Column::Scope.eq(scope.as_str()))
                        .filter(rate_limits::Column::Identifier.eq(identifier.as_str()))
                        .lock_exclusive()
                        .one(txn)
                        .await?
                        .ok_or_else(|| DbErr::RecordNotFound("rate limit window".to_owned()))?;

                    let window = RateLimitWindow {
                        window_start: row.window_start,
                        count: row.count,
                    };
                    let (window_start, count) = match policy.step(Some(&window), now) {
                        WindowStep::Deny => return Ok(RateLimitDecision::Limited),
                        WindowStep::Start => (now, 1),
                        WindowStep::Increment => (row.window_start, row.count + 1),
                    };

                    let mut active: rate_limits::ActiveModel = row.into();
                    active.window_start = Set(window_start);
                    active.count = Set(count);
                    active.update(txn).await?;
                    Ok(RateLimitDecision::Allowed)
                })
            })
            .await
            .store_context("rate limit hit")
    }
}
