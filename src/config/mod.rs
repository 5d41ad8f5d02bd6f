//! Configuration loading for the MotorGuard API.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `MOTORGUARD_`, producing a typed [`AppConfig`]. The result is built once at
//! start-up and handed to the rest of the service through application state.

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Signing secret used when no `JWT_SECRET` is configured in local/test profiles.
const DEV_JWT_SECRET: &str = "motorguard-dev-secret-change-me-in-production";

/// Minimum secret length accepted outside local/test profiles.
const MIN_JWT_SECRET_LEN: usize = 32;

/// Application configuration derived from `MOTORGUARD_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// HMAC secret for session tokens. `None` falls back to a development
    /// secret in local/test profiles and is rejected elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
    /// Accept stored passwords that are not salted hashes, compared as plaintext.
    ///
    /// Environment variable: `MOTORGUARD_ALLOW_PLAINTEXT_PASSWORDS`
    #[serde(default)]
    pub allow_plaintext_passwords: bool,
    #[serde(default = "default_bootstrap_admin_email")]
    pub bootstrap_admin_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_admin_password: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            jwt_secret: None,
            token_ttl_seconds: default_token_ttl_seconds(),
            allow_plaintext_passwords: false,
            bootstrap_admin_email: default_bootstrap_admin_email(),
            bootstrap_admin_password: None,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// True for the profiles that get development defaults.
    pub fn is_dev_profile(&self) -> bool {
        matches!(self.profile.as_str(), "local" | "test")
    }

    /// Secret used to sign and verify session tokens.
    pub fn signing_secret(&self) -> Result<&str, ConfigError> {
        match self.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(secret),
            _ if self.is_dev_profile() => Ok(DEV_JWT_SECRET),
            _ => Err(ConfigError::MissingJwtSecret),
        }
    }

    /// Password for the seeded administrator, if one should be created.
    pub fn bootstrap_password(&self) -> Option<&str> {
        match self.bootstrap_admin_password.as_deref() {
            Some(password) if !password.is_empty() => Some(password),
            _ if self.is_dev_profile() => Some("admin123"),
            _ => None,
        }
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.jwt_secret.is_some() {
            config.jwt_secret = Some("[REDACTED]".to_string());
        }
        if config.bootstrap_admin_password.is_some() {
            config.bootstrap_admin_password = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        let secret = self.signing_secret()?;
        if !self.is_dev_profile() && secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakJwtSecret {
                length: secret.len(),
                min: MIN_JWT_SECRET_LEN,
            });
        }

        if self.token_ttl_seconds == 0 {
            return Err(ConfigError::InvalidTokenTtl {
                value: self.token_ttl_seconds,
            });
        }

        if !is_valid_email(&self.bootstrap_admin_email) {
            return Err(ConfigError::InvalidBootstrapEmail {
                value: self.bootstrap_admin_email.clone(),
            });
        }

        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidDbMaxConnections {
                value: self.db_max_connections,
            });
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://motorguard.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_token_ttl_seconds() -> u64 {
    86400
}

fn default_bootstrap_admin_email() -> String {
    "admin@motorguard.local".to_string()
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    #[error("invalid API bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("database URL must not be empty")]
    MissingDatabaseUrl,
    #[error("MOTORGUARD_JWT_SECRET is required outside local/test profiles")]
    MissingJwtSecret,
    #[error("JWT secret is too short ({length} bytes, need at least {min})")]
    WeakJwtSecret { length: usize, min: usize },
    #[error("token TTL must be positive, got {value}")]
    InvalidTokenTtl { value: u64 },
    #[error("bootstrap admin email '{value}' is not a valid address")]
    InvalidBootstrapEmail { value: String },
    #[error("database max connections must be positive, got {value}")]
    InvalidDbMaxConnections { value: u32 },
}

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
});

/// Loose address check shared by config validation and user creation.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// Loads configuration using layered `.env` files and `MOTORGUARD_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads, merges and validates the configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("MOTORGUARD_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let api_bind_addr = layered
            .remove("API_BIND_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_bind_addr);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);
        let db_max_connections = parse_or(
            &mut layered,
            "DB_MAX_CONNECTIONS",
            default_db_max_connections,
        )?;
        let db_acquire_timeout_ms = parse_or(
            &mut layered,
            "DB_ACQUIRE_TIMEOUT_MS",
            default_db_acquire_timeout_ms,
        )?;
        let jwt_secret = layered.remove("JWT_SECRET").filter(|v| !v.is_empty());
        let token_ttl_seconds =
            parse_or(&mut layered, "TOKEN_TTL_SECONDS", default_token_ttl_seconds)?;
        let allow_plaintext_passwords = match layered.remove("ALLOW_PLAINTEXT_PASSWORDS") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                key: "ALLOW_PLAINTEXT_PASSWORDS",
                value: raw,
            })?,
            None => false,
        };
        let bootstrap_admin_email = layered
            .remove("BOOTSTRAP_ADMIN_EMAIL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_bootstrap_admin_email);
        let bootstrap_admin_password = layered
            .remove("BOOTSTRAP_ADMIN_PASSWORD")
            .filter(|v| !v.is_empty());
        let cors_allowed_origins = layered
            .remove("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            jwt_secret,
            token_ttl_seconds,
            allow_plaintext_passwords,
            bootstrap_admin_email,
            bootstrap_admin_password,
            cors_allowed_origins,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("MOTORGUARD_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("MOTORGUARD_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_or<T: std::str::FromStr>(
    layered: &mut BTreeMap<String, String>,
    key: &'static str,
    default: fn() -> T,
) -> Result<T, ConfigError> {
    match layered.remove(key).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default()),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_in_local_profile() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.signing_secret().unwrap(), DEV_JWT_SECRET);
        assert_eq!(config.bootstrap_password(), Some("admin123"));
    }

    #[test]
    fn production_profile_requires_jwt_secret() {
        let config = AppConfig {
            profile: "production".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingJwtSecret)
        ));
        assert_eq!(config.bootstrap_password(), None);
    }

    #[test]
    fn production_profile_rejects_short_secret() {
        let config = AppConfig {
            profile: "production".to_string(),
            jwt_secret: Some("short".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WeakJwtSecret { length: 5, .. })
        ));
    }

    #[test]
    fn zero_token_ttl_is_rejected() {
        let config = AppConfig {
            token_ttl_seconds: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTokenTtl { value: 0 })
        ));
    }

    #[test]
    fn redacted_json_hides_secrets() {
        let config = AppConfig {
            jwt_secret: Some("super-secret-value".to_string()),
            bootstrap_admin_password: Some("hunter22".to_string()),
            ..Default::default()
        };
        let json = config.redacted_json().unwrap();
        assert!(!json.contains("super-secret-value"));
        assert!(!json.contains("hunter22"));
        assert!(json.contains("[REDACTED]"));
    }

    #[test]
    fn email_check() {
        assert!(is_valid_email("tech@plant.example"));
        assert!(!is_valid_email("tech.plant.example"));
        assert!(!is_valid_email("tech@plant"));
        assert!(!is_valid_email("te ch@plant.example"));
        // Repeated calls share the compiled pattern.
        assert!(is_valid_email("ADMIN@Plant.Example"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn bool_parsing() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
