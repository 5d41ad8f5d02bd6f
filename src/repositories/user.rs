//! # User Repository
//!
//! Account creation, lookup and activation for human users.

use crate::config::is_valid_email;
use crate::crypto;
use crate::error::RepositoryError;
use crate::models::UserRole;
use crate::models::user::{ActiveModel, Column, Entity as User, Model as UserModel};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};

use super::require_text;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Request data for creating a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    /// Plaintext password; hashed before it is stored
    pub password: String,
    pub role: UserRole,
}

/// Repository for User database operations
pub struct UserRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a user with a freshly hashed password
    pub async fn create(&self, request: NewUser) -> Result<UserModel, RepositoryError> {
        let full_name = require_text("full_name", &request.full_name)?;
        let email = request.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(RepositoryError::invalid_field(
                "email",
                "email must be a valid address",
            ));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(RepositoryError::invalid_field(
                "password",
                format!("password must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }

        if self.find_by_email(&email).await?.is_some() {
            return Err(RepositoryError::conflict("Email already registered"));
        }

        let password_hash = crypto::hash_password(&request.password)
            .map_err(|e| RepositoryError::Internal(e.to_string()))?;

        let user = ActiveModel {
            full_name: Set(full_name),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(request.role),
            is_active: Set(true),
            created_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        };

        let created = user
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(user_id = created.id, role = ?created.role, "User created");
        Ok(created)
    }

    pub async fn list(&self) -> Result<Vec<UserModel>, RepositoryError> {
        User::find()
            .order_by_asc(Column::Id)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_id(&self, user_id: i32) -> Result<Option<UserModel>, RepositoryError> {
        User::find_by_id(user_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Look up a user by email (case-insensitive on the stored lowercase form)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, RepositoryError> {
        User::find()
            .filter(Column::Email.eq(email.trim().to_lowercase()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, user_id: i32) -> Result<UserModel, RepositoryError> {
        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("User not found"))
    }

    /// Enable or disable a login
    pub async fn set_active(
        &self,
        user_id: i32,
        is_active: bool,
    ) -> Result<UserModel, RepositoryError> {
        let mut user = self.get(user_id).await?.into_active_model();
        user.is_active = Set(is_active);

        let updated = user
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(user_id, is_active, "User activation changed");
        Ok(updated)
    }

    /// Replace the stored credential with an already computed hash
    pub async fn update_password_hash(
        &self,
        user_id: i32,
        password_hash: String,
    ) -> Result<(), RepositoryError> {
        let mut user = self.get(user_id).await?.into_active_model();
        user.password_hash = Set(password_hash);
        user.update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    /// Users whose stored credential is not a salted hash
    pub async fn find_with_plaintext_passwords(&self) -> Result<Vec<UserModel>, RepositoryError> {
        let users = self.list().await?;
        Ok(users
            .into_iter()
            .filter(|user| !crypto::looks_like_hash(&user.password_hash))
            .collect())
    }
}
