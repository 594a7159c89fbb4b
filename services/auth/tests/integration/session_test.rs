use chrono::Duration;
use uuid::Uuid;

use gada_auth::error::AuthServiceError;
use gada_auth::usecase::session::{LoginInput, LoginUseCase, LogoutUseCase, RefreshUseCase};
use gada_auth::usecase::token::hash_token;
use gada_auth_types::token::validate_access_token;
use gada_testing::auth::TEST_JWT_SECRET;

use crate::helpers::{
    MockRateLimitRepo, MockRefreshTokenRepo, MockUserRepo, PASSWORD, make_user, t0, test_hasher,
};

struct Harness {
    users: MockUserRepo,
    tokens: MockRefreshTokenRepo,
    limits: MockRateLimitRepo,
}

impl Harness {
    fn new(users: MockUserRepo) -> Self {
        Self {
            users,
            tokens: MockRefreshTokenRepo::default(),
            limits: MockRateLimitRepo::default(),
        }
    }

    fn login(&self) -> LoginUseCase<MockUserRepo, MockRefreshTokenRepo, MockRateLimitRepo> {
        LoginUseCase {
            users: self.users.clone(),
            ledger: self.tokens.ledger(),
            limiter: self.limits.limiter(),
            hasher: test_hasher(),
            jwt_secret: TEST_JWT_SECRET.to_owned(),
        }
    }

    fn refresh(&self) -> RefreshUseCase<MockUserRepo, MockRefreshTokenRepo> {
        RefreshUseCase {
            users: self.users.clone(),
            ledger: self.tokens.ledger(),
            jwt_secret: TEST_JWT_SECRET.to_owned(),
        }
    }

    fn logout(&self) -> LogoutUseCase<MockRefreshTokenRepo> {
        LogoutUseCase {
            ledger: self.tokens.ledger(),
        }
    }
}

fn input(username: &str, password: &str) -> LoginInput {
    LoginInput {
        username: username.to_owned(),
        password: password.to_owned(),
        client: "203.0.113.7".to_owned(),
    }
}

#[tokio::test]
async fn should_issue_token_pair_for_approved_verified_user() {
    let user = make_user("alice", true, true).await;
    let h = Harness::new(MockUserRepo::new(vec![user.clone()]));

    let out = h.login().execute(input("alice", PASSWORD), t0()).await.unwrap();

    assert_eq!(out.identity.user_id, user.id);
    assert_eq!(out.tokens.access_token_expires_at, t0() + Duration::minutes(15));
    let identity =
        validate_access_token(&out.tokens.access_token, TEST_JWT_SECRET, t0()).unwrap();
    assert_eq!(identity.username, "alice");

    let stored = h.tokens.snapshot();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].user_id, user.id);
    assert_eq!(stored[0].token_hash, hash_token(&out.tokens.refresh_token));
    assert_ne!(stored[0].token_hash, out.tokens.refresh_token);
    assert_eq!(stored[0].expires_at, t0() + Duration::days(7));
}

#[tokio::test]
async fn should_return_same_error_for_unknown_user_and_wrong_password() {
    let user = make_user("alice", true, true).await;
    let h = Harness::new(MockUserRepo::new(vec![user]));

    let unknown = h.login().execute(input("mallory", PASSWORD), t0()).await.unwrap_err();
    let wrong = h.login().execute(input("alice", "Wrong1!x"), t0()).await.unwrap_err();

    assert!(matches!(unknown, AuthServiceError::InvalidCredentials));
    assert!(matches!(wrong, AuthServiceError::InvalidCredentials));
    assert_eq!(unknown.to_string(), wrong.to_string());
    assert!(h.tokens.snapshot().is_empty());
}

#[tokio::test]
async fn should_report_not_approved_before_not_verified() {
    let user = make_user("newbie", false, false).await;
    let h = Harness::new(MockUserRepo::new(vec![user]));

    let err = h.login().execute(input("newbie", PASSWORD), t0()).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::AccountNotApproved));
}

#[tokio::test]
async fn should_reject_unverified_email_for_approved_user() {
    let user = make_user("pending", true, false).await;
    let h = Harness::new(MockUserRepo::new(vec![user]));

    let err = h.login().execute(input("pending", PASSWORD), t0()).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::EmailNotVerified));
}

#[tokio::test]
async fn should_not_check_credentials_once_throttled() {
    let user = make_user("alice", true, true).await;
    let h = Harness::new(MockUserRepo::new(vec![user]));

    for _ in 0..5 {
        let err = h.login().execute(input("alice", "Wrong1!x"), t0()).await.unwrap_err();
        assert!(matches!(err, AuthServiceError::InvalidCredentials));
    }
    // Even the right password is refused inside the window.
    let err = h.login().execute(input("alice", PASSWORD), t0()).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::RateLimited { .. }));

    let later = t0() + Duration::seconds(60);
    assert!(h.login().execute(input("alice", PASSWORD), later).await.is_ok());
}

#[tokio::test]
async fn should_rotate_refresh_token_and_reject_reuse() {
    let user = make_user("alice", true, true).await;
    let h = Harness::new(MockUserRepo::new(vec![user.clone()]));
    let first = h.login().execute(input("alice", PASSWORD), t0()).await.unwrap();

    // Same instant as the login: the new access token must still differ.
    let second = h
        .refresh()
        .execute(&first.tokens.refresh_token, t0())
        .await
        .unwrap();

    assert_ne!(second.access_token, first.tokens.access_token);
    assert_ne!(second.refresh_token, first.tokens.refresh_token);
    let identity = validate_access_token(&second.access_token, TEST_JWT_SECRET, t0()).unwrap();
    assert_eq!(identity.user_id, user.id);

    let reused = h
        .refresh()
        .execute(&first.tokens.refresh_token, t0())
        .await
        .unwrap_err();
    assert!(matches!(reused, AuthServiceError::InvalidRefreshToken));

    // The successor still works.
    assert!(h.refresh().execute(&second.refresh_token, t0()).await.is_ok());
}

#[tokio::test]
async fn should_allow_exactly_one_of_concurrent_redemptions() {
    let user = make_user("alice", true, true).await;
    let h = Harness::new(MockUserRepo::new(vec![user]));
    let raw = h
        .login()
        .execute(input("alice", PASSWORD), t0())
        .await
        .unwrap()
        .tokens
        .refresh_token;

    let a = h.refresh();
    let b = h.refresh();
    let (ra, rb) = tokio::join!(a.execute(&raw, t0()), b.execute(&raw, t0()));

    assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);
    let live = h.tokens.snapshot().iter().filter(|t| !t.revoked).count();
    assert_eq!(live, 1);
}

#[tokio::test]
async fn should_reject_expired_refresh_token() {
    let user = make_user("alice", true, true).await;
    let h = Harness::new(MockUserRepo::new(vec![user]));
    let raw = h
        .login()
        .execute(input("alice", PASSWORD), t0())
        .await
        .unwrap()
        .tokens
        .refresh_token;

    let at_expiry = t0() + Duration::days(7);
    let err = h.refresh().execute(&raw, at_expiry).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::InvalidRefreshToken));
}

#[tokio::test]
async fn should_reject_unknown_refresh_token() {
    let h = Harness::new(MockUserRepo::default());
    let err = h.refresh().execute("never-issued", t0()).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::InvalidRefreshToken));
}

#[tokio::test]
async fn should_reject_refresh_for_deleted_user() {
    let user = make_user("ghost", true, true).await;
    let users = MockUserRepo::new(vec![user.clone()]);
    let h = Harness::new(users.clone());
    let raw = h
        .login()
        .execute(input("ghost", PASSWORD), t0())
        .await
        .unwrap()
        .tokens
        .refresh_token;
    users.users.lock().unwrap().retain(|u| u.id != user.id);

    let err = h.refresh().execute(&raw, t0()).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::InvalidRefreshToken));
}

#[tokio::test]
async fn should_revoke_on_logout_idempotently() {
    let user = make_user("alice", true, true).await;
    let h = Harness::new(MockUserRepo::new(vec![user]));
    let raw = h
        .login()
        .execute(input("alice", PASSWORD), t0())
        .await
        .unwrap()
        .tokens
        .refresh_token;

    h.logout().execute(Some(&raw)).await;
    h.logout().execute(Some(&raw)).await;
    h.logout().execute(Some("unknown")).await;
    h.logout().execute(None).await;

    assert!(h.tokens.snapshot().iter().all(|t| t.revoked));
    let err = h.refresh().execute(&raw, t0()).await.unwrap_err();
    assert!(matches!(err, AuthServiceError::InvalidRefreshToken));
}

#[tokio::test]
async fn should_complete_logout_when_store_fails() {
    let tokens = MockRefreshTokenRepo::failing_revoke();
    let raw = tokens.ledger().issue(Uuid::new_v4(), t0()).await.unwrap();

    LogoutUseCase {
        ledger: tokens.ledger(),
    }
    .execute(Some(&raw))
    .await;

    assert!(!tokens.snapshot()[0].revoked);
}

#[tokio::test]
async fn should_sweep_only_stale_tokens_up_to_limit() {
    let tokens = MockRefreshTokenRepo::default();
    let ledger = tokens.ledger();
    let user_id = Uuid::new_v4();
    let live = ledger.issue(user_id, t0()).await.unwrap();
    let revoked = ledger.issue(user_id, t0()).await.unwrap();
    ledger.revoke(&revoked).await.unwrap();
    ledger.issue(user_id, t0() - Duration::days(8)).await.unwrap();
    ledger.issue(user_id, t0() - Duration::days(9)).await.unwrap();

    assert_eq!(ledger.sweep(t0(), 2).await.unwrap(), 2);
    assert_eq!(ledger.sweep(t0(), 2).await.unwrap(), 1);
    assert_eq!(ledger.sweep(t0(), 2).await.unwrap(), 0);

    let remaining = tokens.snapshot();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].token_hash, hash_token(&live));
}
