//! # Users API Handlers
//!
//! Account administration. Everything here is admin-only except `/users/me`.

use crate::auth::CurrentUser;
use crate::error::{ApiError, bad_request};
use crate::handlers::types::{ApiJson, ApiPath, ApiQuery, timestamp};
use crate::models::{UserRole, user};
use crate::policy::{Action, Resource, authorize};
use crate::repositories::{NewUser, UserRepository};
use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Request payload for creating a user
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "Jane Doe")]
    pub full_name: String,
    #[schema(example = "jane@plant.example")]
    pub email: String,
    /// At least 6 characters
    pub password: String,
    pub role: UserRole,
}

/// Public view of a user (never includes the password hash)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            created_at: timestamp(&user.created_at),
            full_name: user.full_name,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivationQuery {
    pub is_active: bool,
}

/// Create a user account
#[utoipa::path(
    post,
    path = "/users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    authorize(&current.principal(), Action::ManageUsers, &Resource::None)?;

    let user = UserRepository::new(&state.db)
        .create(NewUser {
            full_name: request.full_name,
            email: request.email,
            password: request.password,
            role: request.role,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// List all users
#[utoipa::path(
    get,
    path = "/users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = [UserResponse]),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    authorize(&current.principal(), Action::ManageUsers, &Resource::None)?;

    let users = UserRepository::new(&state.db).list().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// The authenticated user
#[utoipa::path(
    get,
    path = "/users/me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ApiError)
    ),
    tag = "users"
)]
pub async fn me(current: CurrentUser) -> Result<Json<UserResponse>, ApiError> {
    authorize(&current.principal(), Action::ReadSelf, &Resource::None)?;
    Ok(Json(current.0.into()))
}

/// Fetch a user by id
#[utoipa::path(
    get,
    path = "/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(user_id): ApiPath<i32>,
) -> Result<Json<UserResponse>, ApiError> {
    authorize(&current.principal(), Action::ManageUsers, &Resource::None)?;

    let user = UserRepository::new(&state.db).get(user_id).await?;
    Ok(Json(user.into()))
}

/// Activate or deactivate a user
#[utoipa::path(
    patch,
    path = "/users/{id}/active",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User id"), ActivationQuery),
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Cannot deactivate yourself", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn set_user_active(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(user_id): ApiPath<i32>,
    ApiQuery(query): ApiQuery<ActivationQuery>,
) -> Result<Json<UserResponse>, ApiError> {
    authorize(&current.principal(), Action::ManageUsers, &Resource::None)?;

    if user_id == current.id() && !query.is_active {
        return Err(bad_request("Administrators cannot deactivate themselves"));
    }

    let user = UserRepository::new(&state.db)
        .set_active(user_id, query.is_active)
        .await?;
    Ok(Json(user.into()))
}
