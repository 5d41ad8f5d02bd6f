//! Bootstrap administrator seeding
//!
//! Creates the first administrator account from configuration so that a fresh
//! database can be managed through the API. Safe to run on every start.

use anyhow::{Context, Result};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::models::{UserRole, user};
use crate::repositories::{NewUser, UserRepository};

const BOOTSTRAP_ADMIN_NAME: &str = "Administrator";

/// Seeds the bootstrap administrator if no user owns the configured email.
///
/// Returns the created account, or `None` when nothing was inserted (the user
/// already exists, or no bootstrap password is configured for this profile).
pub async fn seed_bootstrap_admin(
    db: &DatabaseConnection,
    config: &AppConfig,
) -> Result<Option<user::Model>> {
    let users = UserRepository::new(db);
    let email = config.bootstrap_admin_email.as_str();

    if users
        .find_by_email(email)
        .await
        .context("looking up bootstrap administrator")?
        .is_some()
    {
        log::info!("Bootstrap administrator '{}' already exists, skipping", email);
        return Ok(None);
    }

    let Some(password) = config.bootstrap_password() else {
        log::warn!(
            "No bootstrap admin password configured for profile '{}'; skipping seed",
            config.profile
        );
        return Ok(None);
    };

    let admin = users
        .create(NewUser {
            full_name: BOOTSTRAP_ADMIN_NAME.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: UserRole::Admin,
        })
        .await
        .context("creating bootstrap administrator")?;

    log::info!("Created bootstrap administrator '{}'", admin.email);
    Ok(Some(admin))
}
