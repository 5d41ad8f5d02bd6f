//! Legacy credentials: bcrypt hashes from older deployments, the opt-in
//! plaintext fallback, the upgrade on login and the offline re-hash path.

use motorguard::{config::AppConfig, crypto, repositories::UserRepository};
use reqwest::StatusCode;
use serde_json::json;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::*;

async fn insert_legacy_user(app: &TestApp, email: &str, password: &str) -> i32 {
    insert_user_with_stored_password(&app.db, email, password).await.id
}

#[tokio::test]
async fn test_bcrypt_password_logs_in_and_is_upgraded() {
    let app = spawn_test_app().await;
    let stored = "$2a$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW";
    let user_id = insert_legacy_user(&app, "bcrypt@plant.example", stored).await;

    let token = app.login("bcrypt@plant.example", "U*U").await;
    assert!(!token.is_empty());

    let upgraded = UserRepository::new(&app.db).get(user_id).await.unwrap();
    assert!(upgraded.password_hash.starts_with("$argon2id$"));
    assert_eq!(
        crypto::verify_password("U*U", &upgraded.password_hash, false),
        crypto::PasswordCheck::Verified
    );

    app.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bcrypt_password_rejects_wrong_password() {
    let app = spawn_test_app().await;
    let stored = "$2a$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW";
    let user_id = insert_legacy_user(&app, "bcrypt@plant.example", stored).await;

    let response = app
        .client
        .post(app.url("/auth/login-json"))
        .json(&json!({ "email": "bcrypt@plant.example", "password": "U*V" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let unchanged = UserRepository::new(&app.db).get(user_id).await.unwrap();
    assert_eq!(unchanged.password_hash, stored);

    app.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_plaintext_password_rejected_by_default() {
    let app = spawn_test_app().await;
    insert_legacy_user(&app, "legacy@plant.example", "plain-pass").await;

    let response = app
        .client
        .post(app.url("/auth/login-json"))
        .json(&json!({ "email": "legacy@plant.example", "password": "plain-pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_plaintext_fallback_upgrades_stored_password() {
    let config = AppConfig {
        allow_plaintext_passwords: true,
        ..test_config()
    };
    let app = spawn_test_app_with(config).await;
    let user_id = insert_legacy_user(&app, "legacy@plant.example", "plain-pass").await;

    let token = app.login("legacy@plant.example", "plain-pass").await;
    assert!(!token.is_empty());

    let stored = UserRepository::new(&app.db).get(user_id).await.unwrap();
    assert!(crypto::looks_like_hash(&stored.password_hash));
    assert!(
        crypto::verify_password("plain-pass", &stored.password_hash, false).is_match()
    );

    // Second login is verified against the stored hash.
    let again = app.login("legacy@plant.example", "plain-pass").await;
    assert!(!again.is_empty());

    app.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_plaintext_fallback_still_rejects_wrong_password() {
    let config = AppConfig {
        allow_plaintext_passwords: true,
        ..test_config()
    };
    let app = spawn_test_app_with(config).await;
    insert_legacy_user(&app, "legacy@plant.example", "plain-pass").await;

    let response = app
        .client
        .post(app.url("/auth/login-json"))
        .json(&json!({ "email": "legacy@plant.example", "password": "plain-pasS" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_plaintext_scan_finds_only_legacy_rows() {
    let db = setup_test_db().await.unwrap();
    create_technician(&db, "hashed@plant.example").await;
    insert_user_with_stored_password(&db, "legacy@plant.example", "plain-pass").await;

    let legacy = UserRepository::new(&db)
        .find_with_plaintext_passwords()
        .await
        .unwrap();
    assert_eq!(legacy.len(), 1);
    assert_eq!(legacy[0].email, "legacy@plant.example");
}
