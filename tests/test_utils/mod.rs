//! Test utilities for integration tests.
//!
//! In-memory SQLite databases with migrations applied, a real server bound to
//! an ephemeral port, and small fixtures for users, motors and devices.

#![allow(dead_code)]

use anyhow::{Context, Result};
use migration::{Migrator, MigratorTrait};
use motorguard::{
    config::AppConfig,
    models::{UserRole, device, motor, user},
    repositories::{DeviceRepository, MotorRepository, NewMotor, NewUser, UserRepository},
    server::{AppState, create_app},
};
use reqwest::{Client, RequestBuilder};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

pub const ADMIN_EMAIL: &str = "admin@plant.example";
pub const ADMIN_PASSWORD: &str = "admin-pass";
pub const TECH_PASSWORD: &str = "tech-pass";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    // One connection: every pooled connection would otherwise get its own
    // private in-memory database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1);
    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        ..Default::default()
    }
}

pub struct TestServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl TestServerHandle {
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.join_handle.take() {
            let result = handle.await.context("server task join failed")?;
            result?;
        }

        Ok(())
    }
}

impl Drop for TestServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// A running server plus direct access to its database.
pub struct TestApp {
    pub base_url: String,
    pub db: DatabaseConnection,
    pub client: Client,
    pub handle: TestServerHandle,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token)
    }

    pub fn put(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(token)
    }

    pub fn patch(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.patch(self.url(path)).bearer_auth(token)
    }

    pub fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }

    /// JSON login; panics unless the credentials are accepted
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/auth/login-json"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "login failed for {}", email);

        let body: Value = response.json().await.unwrap();
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }
}

/// Spawns the full router on `127.0.0.1:0` with a seeded administrator.
pub async fn spawn_test_app() -> TestApp {
    spawn_test_app_with(test_config()).await
}

pub async fn spawn_test_app_with(config: AppConfig) -> TestApp {
    let db = setup_test_db().await.unwrap();
    create_user(&db, "Ada Admin", ADMIN_EMAIL, ADMIN_PASSWORD, UserRole::Admin).await;

    let state = AppState::new(config, db.clone()).unwrap();
    let app = create_app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let join_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .context("axum server error")
    });

    TestApp {
        base_url: format!("http://{}", addr),
        db,
        client: Client::new(),
        handle: TestServerHandle {
            shutdown_tx: Some(shutdown_tx),
            join_handle: Some(join_handle),
        },
    }
}

pub async fn create_user(
    db: &DatabaseConnection,
    full_name: &str,
    email: &str,
    password: &str,
    role: UserRole,
) -> user::Model {
    UserRepository::new(db)
        .create(NewUser {
            full_name: full_name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role,
        })
        .await
        .unwrap()
}

/// Inserts a technician whose stored credential is written verbatim, bypassing
/// hashing. Used for rows left behind by older deployments.
pub async fn insert_user_with_stored_password(
    db: &DatabaseConnection,
    email: &str,
    stored_password: &str,
) -> user::Model {
    user::ActiveModel {
        full_name: Set("Legacy Lee".to_string()),
        email: Set(email.to_string()),
        password_hash: Set(stored_password.to_string()),
        role: Set(UserRole::Technician),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_technician(db: &DatabaseConnection, email: &str) -> user::Model {
    create_user(db, "Tom Tech", email, TECH_PASSWORD, UserRole::Technician).await
}

pub async fn create_motor(db: &DatabaseConnection, code: &str) -> motor::Model {
    MotorRepository::new(db)
        .create(NewMotor {
            name: format!("Motor {}", code),
            code: code.to_string(),
            location: Some("Hall 1".to_string()),
            description: None,
            device_uid: None,
        })
        .await
        .unwrap()
}

pub async fn create_device(
    db: &DatabaseConnection,
    device_uid: &str,
    motor_id: Option<i32>,
) -> device::Model {
    DeviceRepository::new(db)
        .create(device_uid, motor_id)
        .await
        .unwrap()
}
