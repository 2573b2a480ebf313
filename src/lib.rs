//! Pasture - GitHub organization/team authentication middleware for Axum
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Route Layer (Axum)                      │
//! │  - /login, OAuth callback, /logout                          │
//! │  - require_membership middleware on protected routes        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Auth Core                               │
//! │  - CsrfStore: single-use state tokens                       │
//! │  - GitHubClient: token exchange + membership API            │
//! │  - TeamDirectory: roster cache + identity resolution        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Shared Key-Value Store                      │
//! │  - Redis (tcp/unix descriptor) or in-memory                 │
//! │  - CSRF tokens, team roster cache, access tokens            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `auth`: OAuth flow, session, membership gating
//! - `store`: shared key-value store abstraction
//! - `config`: configuration management
//! - `error`: error types
//! - `metrics`: Prometheus instruments

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod store;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the key-value store, the provider
/// client, and the membership directory.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Shared key-value store (CSRF tokens, roster cache, access tokens)
    pub store: Arc<dyn store::KeyValueStore>,

    /// CSRF state token issuance/validation
    pub csrf: auth::CsrfStore,

    /// GitHub OAuth and membership API client
    pub github: auth::GitHubClient,

    /// Roster cache and identity resolution
    pub directory: auth::TeamDirectory,

    /// Local route path for the OAuth callback
    pub callback_path: String,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Validate configuration (fail fast before serving)
    /// 2. Connect the shared key-value store
    /// 3. Build the provider client and the auth services
    ///
    /// # Errors
    /// Returns error if configuration is invalid or the store is
    /// unreachable
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        config.validate()?;
        let callback_path = config.github.callback_path()?;

        let descriptor = store::StoreDescriptor::parse(&config.store.descriptor)?;
        let store = descriptor.connect().await?;
        store.ping().await?;
        tracing::info!(descriptor = %config.store.descriptor, "Key-value store ready");

        let github = auth::GitHubClient::new(&config.github)?;
        let csrf = auth::CsrfStore::new(store.clone(), config.auth.state_ttl);
        let directory = auth::TeamDirectory::new(
            store.clone(),
            github.clone(),
            config.github.organization.clone(),
            config.store.roster_ttl,
            config.auth.session_max_age,
        );

        tracing::info!(
            org = %config.github.organization,
            callback = %callback_path,
            "Application state initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            csrf,
            github,
            directory,
            callback_path,
        })
    }
}

/// Build the Axum router with the auth routes and ambient endpoints.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments. Host applications
/// merge their own routers on top, wrapping protected routes with
/// [`auth::require_membership`].
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router(&state.callback_path))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(metrics::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
