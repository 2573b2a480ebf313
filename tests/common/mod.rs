//! Common test utilities for E2E tests

use axum::{Extension, Router, middleware, response::IntoResponse, routing::get};
use pasture::auth::{CurrentUser, MembershipRequirement, require_membership};
use pasture::{AppState, config};
use wiremock::MockServer;

/// Test server instance
///
/// Runs the full router against an in-memory store and a wiremock
/// stand-in for GitHub. Individual tests register the provider
/// responses they need on `github`.
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub github: MockServer,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        let github = MockServer::start().await;

        // Create test configuration pointing at the mock provider
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            github: config::GitHubConfig {
                client_id: "test-client-id".to_string(),
                client_secret: "test-client-secret".to_string(),
                organization: "acme".to_string(),
                callback_url: "http://localhost/oauth/callback".to_string(),
                scope: "read:org".to_string(),
                oauth_base_url: format!("{}/login/oauth", github.uri()),
                api_base_url: github.uri(),
                timeout_seconds: 5,
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
                state_ttl: 1000,
                login_page: None,
                post_login_redirect: "/".to_string(),
            },
            store: config::StoreConfig {
                descriptor: "memory:".to_string(),
                roster_ttl: 86400,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client that follows no redirects, so tests can
        // assert on Location headers
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router: library routes plus a set of gated sample routes
        let app = gated_routes(state.clone()).merge(pasture::build_router(state.clone()));

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        Self {
            addr: addr_str,
            state,
            github,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create a signed session cookie value for a user with a team snapshot
    pub fn session_cookie(&self, user: &str, teams: &[&str]) -> String {
        use pasture::auth::{Identity, create_session_token};

        let identity = Identity::new(
            user.to_string(),
            teams.iter().map(ToString::to_string).collect(),
            self.state.config.auth.session_max_age,
        );

        let token = create_session_token(&identity, &self.state.config.auth.session_secret)
            .expect("failed to create test session token");
        format!("session={}", token)
    }

    /// Issue a CSRF state token directly, bypassing /login
    pub async fn issue_state(&self) -> String {
        self.state.csrf.issue().await.unwrap()
    }
}

/// Sample routes wrapped with membership requirements, mirroring how a
/// host application composes the middleware.
fn gated_routes(state: AppState) -> Router {
    let guard = |requirement: MembershipRequirement| {
        tower::ServiceBuilder::new()
            .layer(Extension(requirement))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                require_membership,
            ))
    };

    Router::new()
        .route("/", get(whoami))
        .route_layer(guard(MembershipRequirement::authenticated()))
        .merge(
            Router::new()
                .route("/owners", get(whoami))
                .route_layer(guard(MembershipRequirement::all(["Owners"]))),
        )
        .merge(
            Router::new()
                .route("/intersection", get(whoami))
                .route_layer(guard(MembershipRequirement::all(["ReadWrite", "Owners"]))),
        )
        .merge(
            Router::new()
                .route("/union", get(whoami))
                .route_layer(guard(MembershipRequirement::any(["ReadWrite", "Insights"]))),
        )
        .route("/public", get(public))
        .with_state(state)
}

async fn whoami(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
    identity.user
}

async fn public() -> &'static str {
    "public"
}
