//! GitHub provider client
//!
//! Thin wrapper over the OAuth and REST endpoints this crate needs:
//! authorization URL construction, the code-for-token exchange, and the
//! user/org/team lookups. Every request carries a timeout and a
//! User-Agent (GitHub rejects requests without one). No retries: a
//! failed exchange or membership check is surfaced, and the human
//! re-clicking login is the retry mechanism.

use serde::Deserialize;
use std::time::Duration;

use crate::config::GitHubConfig;
use crate::error::{AppError, Result};
use crate::metrics::{GITHUB_REQUESTS_TOTAL, GITHUB_REQUEST_DURATION_SECONDS};

/// One entry from the org teams listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub id: Option<u64>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentUserResponse {
    login: Option<String>,
}

#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    callback_url: String,
    scope: String,
    oauth_base_url: String,
    api_base_url: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pasture/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            callback_url: config.callback_url.clone(),
            scope: config.scope.clone(),
            oauth_base_url: config.oauth_base_url.trim_end_matches('/').to_string(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build the provider authorization URL for a state token.
    ///
    /// Carries exactly client_id, state, redirect_uri, and scope.
    /// No network call.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&state={}&redirect_uri={}&scope={}",
            self.oauth_base_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(state),
            urlencoding::encode(&self.callback_url),
            urlencoding::encode(&self.scope),
        )
    }

    /// Exchange an authorization code for an access token.
    ///
    /// A response without an `access_token` field (expired or invalid
    /// code) is an `UpstreamAuth` failure, not a crash.
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let url = format!(
            "{}/access_token?client_id={}&client_secret={}&code={}",
            self.oauth_base_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.client_secret),
            urlencoding::encode(code),
        );

        let timer = GITHUB_REQUEST_DURATION_SECONDS
            .with_label_values(&["access_token"])
            .start_timer();
        let response = self
            .http
            .post(url)
            .header("Accept", "application/json")
            .send()
            .await;
        timer.observe_duration();

        let response = self.record("access_token", response)?;
        let body: TokenExchangeResponse =
            response.json().await.map_err(|e| {
                AppError::UpstreamAuth(format!("Token exchange returned malformed JSON: {}", e))
            })?;

        body.access_token.ok_or_else(|| {
            AppError::UpstreamAuth("Token exchange response had no access_token".to_string())
        })
    }

    /// Resolve the authenticated user's login name.
    pub async fn fetch_username(&self, token: &str) -> Result<String> {
        let url = format!("{}/user", self.api_base_url);

        let timer = GITHUB_REQUEST_DURATION_SECONDS
            .with_label_values(&["user"])
            .start_timer();
        let response = self.authed_get(&url, token).await;
        timer.observe_duration();

        let response = self.record("user", response)?;
        let body: CurrentUserResponse = response.json().await.map_err(|e| {
            AppError::UpstreamAuth(format!("User lookup returned malformed JSON: {}", e))
        })?;

        body.login
            .ok_or_else(|| AppError::UpstreamAuth("User lookup response had no login".to_string()))
    }

    /// List the organization's teams.
    pub async fn list_org_teams(&self, org: &str, token: &str) -> Result<Vec<Team>> {
        let url = format!("{}/orgs/{}/teams", self.api_base_url, org);

        let timer = GITHUB_REQUEST_DURATION_SECONDS
            .with_label_values(&["org_teams"])
            .start_timer();
        let response = self.authed_get(&url, token).await;
        timer.observe_duration();

        let response = self.record("org_teams", response)?;
        let teams: Vec<Team> = response.json().await.map_err(|e| {
            AppError::UpstreamAuth(format!("Team listing returned malformed JSON: {}", e))
        })?;
        Ok(teams)
    }

    /// Check organization membership for a user.
    ///
    /// 204 means member; any other status, 404 included, means
    /// non-member. Only a transport failure is an error.
    pub async fn is_org_member(&self, org: &str, username: &str, token: &str) -> Result<bool> {
        let url = format!("{}/orgs/{}/members/{}", self.api_base_url, org, username);

        let timer = GITHUB_REQUEST_DURATION_SECONDS
            .with_label_values(&["org_membership"])
            .start_timer();
        let response = self.authed_get(&url, token).await;
        timer.observe_duration();

        let response = self.record("org_membership", response)?;
        Ok(response.status() == reqwest::StatusCode::NO_CONTENT)
    }

    /// Check team membership for a user. 200 means member.
    pub async fn is_team_member(&self, team_id: u64, username: &str, token: &str) -> Result<bool> {
        let url = format!(
            "{}/teams/{}/memberships/{}",
            self.api_base_url, team_id, username
        );

        let timer = GITHUB_REQUEST_DURATION_SECONDS
            .with_label_values(&["team_membership"])
            .start_timer();
        let response = self.authed_get(&url, token).await;
        timer.observe_duration();

        let response = self.record("team_membership", response)?;
        Ok(response.status() == reqwest::StatusCode::OK)
    }

    async fn authed_get(
        &self,
        url: &str,
        token: &str,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        self.http
            .get(url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/json")
            .send()
            .await
    }

    fn record(
        &self,
        endpoint: &str,
        response: std::result::Result<reqwest::Response, reqwest::Error>,
    ) -> Result<reqwest::Response> {
        match response {
            Ok(response) => {
                GITHUB_REQUESTS_TOTAL
                    .with_label_values(&[endpoint, response.status().as_str()])
                    .inc();
                Ok(response)
            }
            Err(error) => {
                GITHUB_REQUESTS_TOTAL
                    .with_label_values(&[endpoint, "transport_error"])
                    .inc();
                tracing::error!(%error, endpoint, "GitHub request failed");
                Err(AppError::Upstream(error))
            }
        }
    }
}
