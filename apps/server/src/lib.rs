//! # Tally Server
//!
//! REST API for the Tally back office.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Server                                   │
//! │                                                                         │
//! │  client ──► axum Router ──► AuthUser gate ──► handler ──► tally-db      │
//! │                 │                                                       │
//! │                 ├── /api/...        JSON + multipart routes             │
//! │                 └── /uploads/...    product images (read-only)          │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  AppState (Arc)                                                  │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │  Database    │  │  JwtManager  │  │  AppConfig               ││  │
//! │  │  │  (pool)      │  │  (HS256)     │  │  (storage, inventory...) ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config::AppConfig`]. Environment overrides use the `TALLY__`
//! prefix, e.g. `TALLY__SERVER__PORT=8080`.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod upload;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tally_core::access::NewUserInput;
use tally_core::ADMIN_ROLE_NAME;
use tally_db::Database;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

// Re-exports
pub use auth::{AuthUser, JwtManager};
pub use config::AppConfig;
pub use error::{ApiError, ApiResult, ErrorCode};

/// Username of the account created on first start.
pub const BOOTSTRAP_ADMIN_USERNAME: &str = "admin";

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub jwt: JwtManager,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        let jwt = JwtManager::new(&config.auth.jwt_secret, config.auth.token_lifetime_hours);
        AppState { db, jwt, config }
    }
}

/// Builds the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api_root = state.config.server.api_root.trim_end_matches('/').to_string();
    let api = routes::api_router();

    let router = if api_root.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&api_root, api)
    };

    router
        .nest_service(
            upload::UPLOADS_URL,
            ServeDir::new(&state.config.storage.uploads_dir),
        )
        .layer(DefaultBodyLimit::max(state.config.storage.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Creates the `admin` account when the user table is empty.
///
/// Returns whether an account was created.
pub async fn ensure_bootstrap_admin(db: &Database, config: &AppConfig) -> Result<bool, ApiError> {
    if db.users().count().await? > 0 {
        return Ok(false);
    }

    let role = db.roles().find_by_name(ADMIN_ROLE_NAME).await?;
    if role.is_none() {
        warn!("Admin role missing, bootstrap account has no role");
    }

    let password = config.auth.bootstrap_admin_password.clone();
    let hash = auth::hash_password(password.clone()).await?;
    let input = NewUserInput {
        username: BOOTSTRAP_ADMIN_USERNAME.to_string(),
        password,
        full_name: Some("Administrator".to_string()),
        role_id: role.map(|r| r.id),
    };
    db.users().create(&input, &hash).await?;

    info!(username = BOOTSTRAP_ADMIN_USERNAME, "Bootstrap admin account created");
    Ok(true)
}
