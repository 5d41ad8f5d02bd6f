//! # Auth API Handlers
//!
//! Password login in both form-encoded (OAuth2 password-grant style) and JSON
//! flavours. Both return the same bearer token body.

use crate::auth::authenticate_password;
use crate::error::{ApiError, ErrorType};
use crate::handlers::types::{ApiForm, ApiJson};
use crate::server::AppState;
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Form body for `/auth/login`; `username` carries the email
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    #[schema(example = "admin@motorguard.local")]
    pub username: String,
    pub password: String,
}

/// JSON body for `/auth/login-json`
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "admin@motorguard.local")]
    pub email: String,
    pub password: String,
}

/// Issued session token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
}

async fn issue_token(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = authenticate_password(&state.db, &state.config, email, password).await?;

    let access_token = state.tokens.issue(user.id).map_err(|error| {
        tracing::error!(%error, "Failed to sign session token");
        ApiError::from(ErrorType::InternalServerError)
    })?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// Log in with a form-encoded username (email) and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Inactive user or malformed body", body = ApiError),
        (status = 401, description = "Incorrect email or password", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ApiForm(form): ApiForm<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    issue_token(&state, &form.username, &form.password).await
}

/// Log in with a JSON email and password
#[utoipa::path(
    post,
    path = "/auth/login-json",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Inactive user or malformed body", body = ApiError),
        (status = 401, description = "Incorrect email or password", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login_json(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    issue_token(&state, &request.email, &request.password).await
}
