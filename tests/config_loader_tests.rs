use motorguard::config::{ConfigError, ConfigLoader};
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const STRONG_SECRET: &str = "0123456789abcdef0123456789abcdef-prod";

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    let keys: Vec<String> = env::vars()
        .map(|(key, _)| key)
        .filter(|key| key.starts_with("MOTORGUARD_"))
        .collect();
    for key in keys {
        unsafe {
            env::remove_var(key);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

fn empty_loader() -> (TempDir, ConfigLoader) {
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    (temp_dir, loader)
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();

    let (_dir, loader) = empty_loader();
    let cfg = loader.load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8000");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.token_ttl_seconds, 86400);
    assert!(!cfg.allow_plaintext_passwords);
    assert_eq!(cfg.bootstrap_admin_email, "admin@motorguard.local");
    assert!(cfg.signing_secret().is_ok());
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "MOTORGUARD_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "MOTORGUARD_API_BIND_ADDR=192.168.0.10:5000\nMOTORGUARD_TOKEN_TTL_SECONDS=600\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "MOTORGUARD_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "MOTORGUARD_PROFILE=test\nMOTORGUARD_API_BIND_ADDR=127.0.0.1:4000\n",
    );

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.token_ttl_seconds, 600);
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "MOTORGUARD_API_BIND_ADDR=127.0.0.1:3000\nMOTORGUARD_CORS_ALLOWED_ORIGINS=http://a.example\n",
    );

    unsafe {
        env::set_var("MOTORGUARD_API_BIND_ADDR", "0.0.0.0:9090");
        env::set_var(
            "MOTORGUARD_CORS_ALLOWED_ORIGINS",
            "http://b.example, http://c.example",
        );
    }

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert_eq!(
        cfg.cors_allowed_origins,
        vec!["http://b.example".to_string(), "http://c.example".to_string()]
    );

    clear_env();
}

#[test]
fn invalid_bind_addr_returns_error() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("MOTORGUARD_API_BIND_ADDR", "not-an-addr");
    }
    let (_dir, loader) = empty_loader();
    let err = loader.load().expect_err("invalid bind addr should fail");
    assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));

    clear_env();
}

#[test]
fn production_profile_requires_strong_jwt_secret() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("MOTORGUARD_PROFILE", "prod");
    }
    let (_dir, loader) = empty_loader();
    let err = loader.load().expect_err("missing secret should fail");
    assert!(matches!(err, ConfigError::MissingJwtSecret));

    unsafe {
        env::set_var("MOTORGUARD_JWT_SECRET", "short");
    }
    let err = loader.load().expect_err("short secret should fail");
    assert!(matches!(err, ConfigError::WeakJwtSecret { .. }));

    unsafe {
        env::set_var("MOTORGUARD_JWT_SECRET", STRONG_SECRET);
    }
    let cfg = loader.load().expect("strong secret is accepted");
    assert_eq!(cfg.signing_secret().unwrap(), STRONG_SECRET);
    assert!(cfg.bootstrap_password().is_none());

    clear_env();
}

#[test]
fn zero_token_ttl_is_rejected() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("MOTORGUARD_TOKEN_TTL_SECONDS", "0");
    }
    let (_dir, loader) = empty_loader();
    let err = loader.load().expect_err("zero ttl should fail");
    assert!(matches!(err, ConfigError::InvalidTokenTtl { .. }));

    clear_env();
}

#[test]
fn plaintext_flag_parses_booleans() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("MOTORGUARD_ALLOW_PLAINTEXT_PASSWORDS", "true");
    }
    let (_dir, loader) = empty_loader();
    assert!(loader.load().unwrap().allow_plaintext_passwords);

    unsafe {
        env::set_var("MOTORGUARD_ALLOW_PLAINTEXT_PASSWORDS", "maybe");
    }
    let err = loader.load().expect_err("garbage bool should fail");
    assert!(matches!(err, ConfigError::InvalidValue { .. }));

    clear_env();
}

#[test]
fn redacted_json_hides_secrets() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("MOTORGUARD_JWT_SECRET", STRONG_SECRET);
        env::set_var("MOTORGUARD_BOOTSTRAP_ADMIN_PASSWORD", "super-secret-pass");
    }
    let (_dir, loader) = empty_loader();
    let json = loader.load().unwrap().redacted_json().unwrap();

    assert!(!json.contains(STRONG_SECRET));
    assert!(!json.contains("super-secret-pass"));
    assert!(json.contains("[REDACTED]"));

    clear_env();
}
