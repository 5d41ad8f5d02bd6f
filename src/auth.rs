//! # Authentication
//!
//! Two independent credential schemes:
//! - session tokens: HS256 JWTs carried as `Authorization: Bearer <token>`,
//!   resolved to a [`CurrentUser`];
//! - device keys: static secrets carried in `X-API-Key`, resolved to a
//!   [`DeviceAuth`] (and stamping the device's `last_seen`).

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use metrics::counter;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{AppConfig, ConfigError};
use crate::crypto;
use crate::error::{ApiError, bad_request, invalid_api_key, unauthorized};
use crate::models::{device, user};
use crate::policy::Principal;
use crate::repositories::{DeviceRepository, UserRepository};
use crate::server::AppState;

/// Header carrying a device API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Claims embedded in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a decimal string
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token encoding failed: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
    #[error("token rejected: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("token subject is not a user id")]
    BadSubject,
}

/// Issues and verifies session tokens with the configured secret
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_seconds: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_seconds: i64::try_from(ttl_seconds).unwrap_or(i64::MAX),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let secret = config.signing_secret()?;
        Ok(Self::new(secret.as_bytes(), config.token_ttl_seconds))
    }

    /// Issue a token for `user_id`, valid for the configured TTL
    pub fn issue(&self, user_id: i32) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat,
            exp: iat.saturating_add(self.ttl_seconds),
        };
        self.encode_claims(&claims)
    }

    pub(crate) fn encode_claims(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(TokenError::Encode)
    }

    /// Check signature and expiry, returning the user id in `sub`
    pub fn verify(&self, token: &str) -> Result<i32, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(TokenError::Invalid)?;
        data.claims
            .sub
            .parse::<i32>()
            .map_err(|_| TokenError::BadSubject)
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Not authenticated")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(unauthorized(Some(
            "Authorization header must use Bearer scheme",
        )));
    }

    Ok(token.trim())
}

/// The active user behind a bearer token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

impl CurrentUser {
    pub fn principal(&self) -> Principal {
        Principal::from(&self.0)
    }

    pub fn id(&self) -> i32 {
        self.0.id
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        let user_id = state.tokens.verify(token).map_err(|error| {
            tracing::debug!(%error, "Bearer token rejected");
            unauthorized(None)
        })?;

        let user = UserRepository::new(&state.db)
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| unauthorized(None))?;

        if !user.is_active {
            return Err(bad_request("Inactive user"));
        }

        Ok(CurrentUser(user))
    }
}

/// The active device behind an `X-API-Key` header
#[derive(Debug, Clone)]
pub struct DeviceAuth(pub device::Model);

impl DeviceAuth {
    pub fn principal(&self) -> Principal {
        Principal::from(&self.0)
    }
}

impl FromRequestParts<AppState> for DeviceAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let api_key = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(invalid_api_key)?;

        let devices = DeviceRepository::new(&state.db);
        let device = devices
            .find_active_by_api_key(api_key)
            .await?
            .ok_or_else(|| {
                tracing::info!("Device authentication failed");
                invalid_api_key()
            })?;

        devices.touch_last_seen(device.id).await?;
        tracing::debug!(device_id = device.id, "Device authenticated");

        Ok(DeviceAuth(device))
    }
}

/// Check an email/password pair and return the matching active user.
///
/// Unknown emails and wrong passwords are indistinguishable to the caller.
/// A login that matched a bcrypt hash or the plaintext fallback upgrades the
/// stored credential to an Argon2id hash.
pub async fn authenticate_password(
    db: &DatabaseConnection,
    config: &AppConfig,
    email: &str,
    password: &str,
) -> Result<user::Model, ApiError> {
    let users = UserRepository::new(db);

    let Some(user) = users.find_by_email(email).await? else {
        counter!("auth_login_total", "outcome" => "unknown_user").increment(1);
        return Err(unauthorized(Some("Incorrect email or password")));
    };

    let check = crypto::verify_password(
        password,
        &user.password_hash,
        config.allow_plaintext_passwords,
    );

    if !check.is_match() {
        counter!("auth_login_total", "outcome" => "bad_password").increment(1);
        tracing::info!(user_id = user.id, "Login rejected");
        return Err(unauthorized(Some("Incorrect email or password")));
    }

    if !user.is_active {
        counter!("auth_login_total", "outcome" => "inactive").increment(1);
        return Err(bad_request("Inactive user"));
    }

    if check.needs_rehash() {
        match crypto::hash_password(password) {
            Ok(hash) => {
                users.update_password_hash(user.id, hash).await?;
                tracing::warn!(user_id = user.id, ?check, "Upgraded stored password to Argon2id");
            }
            Err(error) => tracing::error!(user_id = user.id, %error, "Password re-hash failed"),
        }
    }

    counter!("auth_login_total", "outcome" => "success").increment(1);
    tracing::info!(user_id = user.id, "Login succeeded");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service() -> TokenService {
        TokenService::new(b"unit-test-secret-unit-test-secret", 3600)
    }

    #[test]
    fn issued_token_resolves_to_same_user() {
        let tokens = service();
        let token = tokens.issue(42).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), 42);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = TokenService::new(b"another-secret-another-secret-00", 3600)
            .issue(42)
            .unwrap();
        assert!(matches!(
            service().verify(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let now = Utc::now().timestamp();
        let token = tokens
            .encode_claims(&Claims {
                sub: "42".to_string(),
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();
        assert!(matches!(tokens.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn non_numeric_subject_is_rejected() {
        let tokens = service();
        let now = Utc::now().timestamp();
        let token = tokens
            .encode_claims(&Claims {
                sub: "admin".to_string(),
                iat: now,
                exp: now + 60,
            })
            .unwrap();
        assert!(matches!(tokens.verify(&token), Err(TokenError::BadSubject)));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(service().verify("not-a-jwt").is_err());
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
    }
}
