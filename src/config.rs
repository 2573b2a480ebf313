//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    pub auth: AuthConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
}

/// GitHub OAuth application and API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Organization whose membership gates access
    pub organization: String,
    /// Full callback URL registered with the OAuth app.
    /// Its path becomes a local route, so it must be non-empty.
    pub callback_url: String,
    /// OAuth scope; must grant org read access
    pub scope: String,
    /// OAuth endpoint base (overridable for tests)
    pub oauth_base_url: String,
    /// REST API base (overridable for tests)
    pub api_base_url: String,
    /// Per-request timeout for provider calls
    pub timeout_seconds: u64,
}

impl GitHubConfig {
    /// Local route path extracted from the callback URL
    pub fn callback_path(&self) -> Result<String, crate::error::AppError> {
        let url = url::Url::parse(&self.callback_url).map_err(|e| {
            crate::error::AppError::Config(format!("github.callback_url is invalid: {}", e))
        })?;
        let path = url.path();
        if path.is_empty() || path == "/" {
            return Err(crate::error::AppError::Config(
                "github.callback_url must include a non-root path".to_string(),
            ));
        }
        Ok(path.to_string())
    }
}

/// Session and CSRF state configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
    /// CSRF state token TTL in seconds (default: 1000)
    pub state_ttl: i64,
    /// Optional login page template; `{{url}}` is replaced with
    /// the authorization URL. Built-in page when unset.
    pub login_page: Option<PathBuf>,
    /// Where to send the user after a successful login
    pub post_login_redirect: String,
}

/// Shared key-value store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Connection descriptor: `tcp:{host}:{port},{db}`, `unix:{path}`,
    /// or `memory:` for the in-process backend.
    pub descriptor: String,
    /// Team roster cache TTL in seconds (default: 86400 = 24h)
    pub roster_ttl: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (PASTURE_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("github.scope", "read:org")?
            .set_default("github.oauth_base_url", "https://github.com/login/oauth")?
            .set_default("github.api_base_url", "https://api.github.com")?
            .set_default("github.timeout_seconds", 10)?
            .set_default("auth.session_max_age", 604800)?
            .set_default("auth.state_ttl", 1000)?
            .set_default("auth.post_login_redirect", "/")?
            .set_default("store.descriptor", "memory:")?
            .set_default("store.roster_ttl", 86400)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (PASTURE_*)
            .add_source(
                Environment::with_prefix("PASTURE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Session cookies carry `Secure` only for https callback URLs,
    /// so local development over plain http still works.
    pub fn should_use_secure_cookies(&self) -> bool {
        self.github.callback_url.starts_with("https://")
    }

    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.state_ttl <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.state_ttl must be greater than 0".to_string(),
            ));
        }

        if self.store.roster_ttl <= 0 {
            return Err(crate::error::AppError::Config(
                "store.roster_ttl must be greater than 0".to_string(),
            ));
        }

        // Fails fast on unparsable callback URLs and empty paths
        self.github.callback_path()?;

        if !scope_grants_org_read(&self.github.scope) {
            return Err(crate::error::AppError::Config(format!(
                "github.scope must include org read access (read:org, write:org, or admin:org), got: {}",
                self.github.scope
            )));
        }

        crate::store::StoreDescriptor::parse(&self.store.descriptor)?;

        Ok(())
    }
}

fn scope_grants_org_read(scope: &str) -> bool {
    scope
        .split([' ', ','])
        .filter(|s| !s.is_empty())
        .any(|s| matches!(s, "read:org" | "write:org" | "admin:org"))
}
