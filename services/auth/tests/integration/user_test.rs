use uuid::Uuid;

use gada_auth::error::AuthServiceError;
use gada_auth::usecase::user::{
    ApproveUserUseCase, GetUserUseCase, RegisterInput, RegisterUseCase, SeedAdminUseCase,
};
use gada_domain::user::UserRole;

use crate::helpers::{MockUserRepo, PASSWORD, make_user, t0, test_hasher};

fn input(username: &str, role: UserRole) -> RegisterInput {
    RegisterInput {
        username: username.to_owned(),
        email: format!("{username}@example.com"),
        password: PASSWORD.to_owned(),
        role,
    }
}

fn register(users: &MockUserRepo) -> RegisterUseCase<MockUserRepo> {
    RegisterUseCase {
        users: users.clone(),
        hasher: test_hasher(),
    }
}

#[tokio::test]
async fn should_register_user_unapproved_and_unverified() {
    let users = MockUserRepo::default();
    let profile = register(&users)
        .execute(input("alice", UserRole::User), t0())
        .await
        .unwrap();

    assert!(!profile.approved);
    assert!(!profile.email_verified);
    assert_eq!(profile.role, UserRole::User);

    let stored = users.get(profile.id).unwrap();
    assert_ne!(stored.password_hash, PASSWORD);
    assert!(test_hasher().verify(PASSWORD, &stored.password_hash).await.unwrap());
}

#[tokio::test]
async fn should_auto_approve_registered_admin() {
    let users = MockUserRepo::default();
    let profile = register(&users)
        .execute(input("root", UserRole::Admin), t0())
        .await
        .unwrap();

    assert!(profile.approved);
    assert!(!profile.email_verified);
}

#[tokio::test]
async fn should_reject_duplicate_username() {
    let users = MockUserRepo::default();
    let usecase = register(&users);
    usecase
        .execute(input("alice", UserRole::User), t0())
        .await
        .unwrap();

    let err = usecase
        .execute(input("alice", UserRole::User), t0())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthServiceError::UserAlreadyExists));
}

#[tokio::test]
async fn should_reject_weak_password_on_register() {
    let err = register(&MockUserRepo::default())
        .execute(
            RegisterInput {
                password: "password".to_owned(),
                ..input("alice", UserRole::User)
            },
            t0(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthServiceError::WeakPassword(ref missing) if missing.len() == 3));
}

#[tokio::test]
async fn should_approve_existing_user() {
    let user = make_user("alice", false, false).await;
    let users = MockUserRepo::new(vec![user.clone()]);

    ApproveUserUseCase {
        users: users.clone(),
    }
    .execute(user.id, t0())
    .await
    .unwrap();

    assert!(users.get(user.id).unwrap().approved);
}

#[tokio::test]
async fn should_report_unknown_user_on_approve() {
    let err = ApproveUserUseCase {
        users: MockUserRepo::default(),
    }
    .execute(Uuid::new_v4(), t0())
    .await
    .unwrap_err();
    assert!(matches!(err, AuthServiceError::UserNotFound));
}

#[tokio::test]
async fn should_return_profile_without_secrets() {
    let mut user = make_user("alice", true, true).await;
    user.password_reset_token = Some("digest".to_owned());
    let users = MockUserRepo::new(vec![user.clone()]);

    let profile = GetUserUseCase { users }.execute(user.id).await.unwrap();
    let json = serde_json::to_value(&profile).unwrap();

    assert_eq!(json["username"], "alice");
    assert_eq!(json["created_at"], "2025-08-18T12:00:00.000Z");
    assert!(json.get("password_hash").is_none());
    assert!(json.get("password_reset_token").is_none());
}

#[tokio::test]
async fn should_seed_admin_then_reset_existing_account() {
    let user = make_user("root", false, false).await;
    let users = MockUserRepo::new(vec![user.clone()]);
    let usecase = SeedAdminUseCase {
        users: users.clone(),
        hasher: test_hasher(),
    };

    usecase
        .execute("root", "admin@example.com", "N3w!Admin", t0())
        .await
        .unwrap();

    let stored = users.get(user.id).unwrap();
    assert_eq!(stored.role, UserRole::Admin);
    assert!(stored.approved);
    assert!(stored.email_verified);
    assert_eq!(stored.email, "admin@example.com");
    assert!(test_hasher().verify("N3w!Admin", &stored.password_hash).await.unwrap());
    assert_eq!(users.users.lock().unwrap().len(), 1);
}
