//! Pasture demo binary
//!
//! Wires the library into a small application with public and
//! team-gated routes, mirroring how a host application consumes it.

use axum::{Extension, Router, middleware, response::IntoResponse, routing::get};
use pasture::auth::{CurrentUser, MembershipRequirement, require_membership};
use pasture::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Initialize metrics
/// 3. Load configuration from file and environment
/// 4. Initialize AppState
/// 5. Build Axum router with demo routes
/// 6. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("PASTURE__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "pasture=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "pasture=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting Pasture...");

    // 2. Initialize metrics
    pasture::metrics::init_metrics();

    // 3. Load configuration
    let config = config::AppConfig::load()?;
    tracing::info!(
        org = %config.github.organization,
        callback = %config.github.callback_url,
        "Configuration loaded"
    );

    // 4. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 5. Build Axum router with demo routes
    let app = demo_routes(state.clone()).merge(pasture::build_router(state));

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Sample gated routes demonstrating the requirement combinators.
fn demo_routes(state: AppState) -> Router {
    // The requirement extension must be attached outside the gate so
    // the middleware sees it on the way in.
    let guard = |requirement: MembershipRequirement| {
        tower::ServiceBuilder::new()
            .layer(Extension(requirement))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                require_membership,
            ))
    };

    Router::new()
        .route("/", get(home))
        .route_layer(guard(MembershipRequirement::authenticated()))
        .merge(
            Router::new()
                .route("/owners", get(owners_only))
                .route_layer(guard(MembershipRequirement::all(["Owners"]))),
        )
        .merge(
            Router::new()
                .route("/intersection", get(owners_only))
                .route_layer(guard(MembershipRequirement::all(["ReadWrite", "Owners"]))),
        )
        .merge(
            Router::new()
                .route("/union", get(home))
                .route_layer(guard(MembershipRequirement::any(["ReadWrite", "Insights"]))),
        )
        .route("/public", get(public))
        .with_state(state)
}

async fn home(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
    format!("Hello, {} (teams: {})", identity.user, identity.teams.join(", "))
}

async fn owners_only(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
    format!("Welcome, {}", identity.user)
}

async fn public() -> &'static str {
    "No login required here"
}
