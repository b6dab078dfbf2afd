//! Account lookups against a real database.
//!
//! These tests require a running `PostgreSQL` database reachable through
//! `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`).
//!
//! Run with: cargo test -p loam-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use uuid::Uuid;

use loam_core::{Email, Role};
use loam_integration_tests::database;
use loam_storefront::db::UserRepository;
use loam_storefront::services::auth::{AuthError, AuthService};

fn unique_email() -> String {
    format!("grower-{}@loam.example", Uuid::new_v4())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_get_user_reflects_role_change() {
    let pool = database().await;
    let auth = AuthService::new(&pool);
    let email = unique_email();

    let user = auth
        .register_with_password(&email, "compost-tea-2026")
        .await
        .unwrap();
    assert_eq!(auth.get_user(user.id).await.unwrap().role, Role::Customer);

    UserRepository::new(&pool)
        .set_role(&Email::parse(&email).unwrap(), Role::Admin)
        .await
        .unwrap();
    assert_eq!(auth.get_user(user.id).await.unwrap().role, Role::Admin);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_get_user_after_delete_is_not_found() {
    let pool = database().await;
    let auth = AuthService::new(&pool);

    let user = auth
        .register_with_password(&unique_email(), "compost-tea-2026")
        .await
        .unwrap();
    assert!(UserRepository::new(&pool).delete(user.id).await.unwrap());

    assert!(matches!(
        auth.get_user(user.id).await,
        Err(AuthError::UserNotFound)
    ));
}
