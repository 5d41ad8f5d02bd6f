//! # Server Configuration
//!
//! Router assembly, shared state and the HTTP listener for the MotorGuard API.

use std::sync::Arc;

use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, patch, post, put},
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::handlers;
use crate::logging::trace_id_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DatabaseConnection,
    ) -> Result<Self, crate::config::ConfigError> {
        let tokens = TokenService::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            db,
            tokens,
        })
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter(|origin| origin.as_str() != "*")
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    let wildcard = config.cors_allowed_origins.is_empty()
        || config.cors_allowed_origins.iter().any(|origin| origin == "*");

    if wildcard || origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

fn api_routes() -> Router<AppState> {
    use handlers::{auth, devices, iot, maintenance, motors, safety, telemetry, users};

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/readyz", get(handlers::readyz))
        // auth
        .route("/auth/login", post(auth::login))
        .route("/auth/login-json", post(auth::login_json))
        // users
        .route("/users", post(users::create_user).get(users::list_users))
        .route("/users/", post(users::create_user).get(users::list_users))
        .route("/users/me", get(users::me))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/active", patch(users::set_user_active))
        // motors
        .route("/motors", post(motors::create_motor).get(motors::list_motors))
        .route("/motors/", post(motors::create_motor).get(motors::list_motors))
        .route(
            "/motors/{id}",
            get(motors::get_motor)
                .put(motors::update_motor)
                .delete(motors::delete_motor),
        )
        // telemetry
        .route("/telemetry", post(telemetry::create_telemetry))
        .route("/telemetry/", post(telemetry::create_telemetry))
        .route("/telemetry/motor/{id}", get(telemetry::motor_history))
        .route("/telemetry/motor/{id}/latest", get(telemetry::motor_latest))
        // maintenance
        .route(
            "/maintenance/tasks",
            post(maintenance::create_task).get(maintenance::list_tasks),
        )
        .route("/maintenance/tasks/{id}", get(maintenance::get_task))
        .route(
            "/maintenance/tasks/{id}/status",
            put(maintenance::update_task_status),
        )
        .route("/maintenance/reports", post(maintenance::create_report))
        .route(
            "/maintenance/reports/task/{id}",
            get(maintenance::get_report_for_task),
        )
        // safety
        .route("/safety/configs", post(safety::create_config))
        .route(
            "/safety/configs/motor/{id}",
            get(safety::get_config).put(safety::update_config),
        )
        // devices
        .route(
            "/esp32-devices",
            post(devices::create_device).get(devices::list_devices),
        )
        .route(
            "/esp32-devices/",
            post(devices::create_device).get(devices::list_devices),
        )
        .route(
            "/esp32-devices/{id}",
            get(devices::get_device).delete(devices::delete_device),
        )
        .route("/esp32-devices/{id}/motor", patch(devices::bind_motor))
        .route(
            "/esp32-devices/{id}/regenerate-api-key",
            post(devices::regenerate_api_key),
        )
        .route(
            "/esp32-devices/{id}/activate",
            patch(devices::set_device_active),
        )
        // iot
        .route("/iot/motor/status", get(iot::motor_status))
        .route("/iot/motor/command", post(iot::motor_command))
        .route("/iot/telemetry/from-esp32", post(iot::ingest_from_device))
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    api_routes()
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(cors)
                .layer(middleware::from_fn(trace_id_middleware))
                .layer(TraceLayer::new_for_http()),
        )
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();

    let state = AppState::new(config, db)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::readyz,
        crate::handlers::auth::login,
        crate::handlers::auth::login_json,
        crate::handlers::users::create_user,
        crate::handlers::users::list_users,
        crate::handlers::users::me,
        crate::handlers::users::get_user,
        crate::handlers::users::set_user_active,
        crate::handlers::motors::create_motor,
        crate::handlers::motors::list_motors,
        crate::handlers::motors::get_motor,
        crate::handlers::motors::update_motor,
        crate::handlers::motors::delete_motor,
        crate::handlers::telemetry::create_telemetry,
        crate::handlers::telemetry::motor_history,
        crate::handlers::telemetry::motor_latest,
        crate::handlers::maintenance::create_task,
        crate::handlers::maintenance::list_tasks,
        crate::handlers::maintenance::get_task,
        crate::handlers::maintenance::update_task_status,
        crate::handlers::maintenance::create_report,
        crate::handlers::maintenance::get_report_for_task,
        crate::handlers::safety::create_config,
        crate::handlers::safety::get_config,
        crate::handlers::safety::update_config,
        crate::handlers::devices::create_device,
        crate::handlers::devices::list_devices,
        crate::handlers::devices::get_device,
        crate::handlers::devices::bind_motor,
        crate::handlers::devices::regenerate_api_key,
        crate::handlers::devices::set_device_active,
        crate::handlers::devices::delete_device,
        crate::handlers::iot::motor_status,
        crate::handlers::iot::motor_command,
        crate::handlers::iot::ingest_from_device,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::UserRole,
            crate::models::TaskStatus,
            crate::error::ApiError,
            crate::handlers::StatusMessage,
            crate::handlers::auth::LoginForm,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::TokenResponse,
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UserResponse,
            crate::handlers::motors::CreateMotorRequest,
            crate::handlers::motors::UpdateMotorRequest,
            crate::handlers::motors::MotorResponse,
            crate::handlers::telemetry::TelemetryRequest,
            crate::handlers::telemetry::TelemetryResponse,
            crate::handlers::maintenance::CreateTaskRequest,
            crate::handlers::maintenance::TaskResponse,
            crate::handlers::maintenance::CreateReportRequest,
            crate::handlers::maintenance::ReportResponse,
            crate::handlers::safety::CreateSafetyConfigRequest,
            crate::handlers::safety::UpdateSafetyConfigRequest,
            crate::handlers::safety::SafetyConfigResponse,
            crate::handlers::devices::CreateDeviceRequest,
            crate::handlers::devices::DeviceResponse,
            crate::handlers::devices::DeviceCredentialsResponse,
            crate::handlers::iot::MotorStatusResponse,
            crate::handlers::iot::MotorCommandRequest,
            crate::handlers::iot::IngestResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "root", description = "Service information and probes"),
        (name = "auth", description = "Password login"),
        (name = "users", description = "User administration"),
        (name = "motors", description = "Motor registry"),
        (name = "telemetry", description = "Sensor samples"),
        (name = "maintenance", description = "Maintenance tasks and reports"),
        (name = "safety", description = "Per-motor safety thresholds"),
        (name = "devices", description = "Sensor device credentials"),
        (name = "iot", description = "Device simulation endpoints"),
    ),
    info(
        title = "MotorGuard API",
        description = "Industrial motor monitoring and maintenance backend",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
