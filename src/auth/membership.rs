//! Organization and team membership resolution
//!
//! `TeamDirectory` orchestrates the membership lookups around a shared
//! roster cache: the org's team name-to-id mapping is fetched once,
//! written to the store with a TTL, and reused across requests and
//! processes. Full team membership is snapshotted once per successful
//! login; protected-route checks never touch the network.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::github::GitHubClient;
use super::session::Identity;
use crate::error::{AppError, Result};
use crate::metrics::{CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL, LOGINS_TOTAL};
use crate::store::KeyValueStore;

/// Team name to team id, scoped to one organization.
pub type TeamRoster = BTreeMap<String, u64>;

const ROSTER_CACHE_NAME: &str = "team_roster";

#[derive(Clone)]
pub struct TeamDirectory {
    store: Arc<dyn KeyValueStore>,
    github: GitHubClient,
    organization: String,
    roster_ttl: i64,
    session_max_age: i64,
}

impl TeamDirectory {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        github: GitHubClient,
        organization: String,
        roster_ttl: i64,
        session_max_age: i64,
    ) -> Self {
        Self {
            store,
            github,
            organization,
            roster_ttl,
            session_max_age,
        }
    }

    fn roster_key(&self) -> String {
        format!("teams:{}", self.organization)
    }

    fn token_key(username: &str) -> String {
        format!("token:{}", username)
    }

    /// The organization's team roster, from the cache when fresh.
    ///
    /// The cache is global per organization. Concurrent cold-start
    /// requests may both miss and both refetch; last writer wins, and
    /// staleness is bounded by the TTL.
    pub async fn roster(&self, token: &str) -> Result<TeamRoster> {
        if let Some(cached) = self.store.get(&self.roster_key()).await? {
            if let Ok(roster) = serde_json::from_str::<TeamRoster>(&cached) {
                CACHE_HITS_TOTAL
                    .with_label_values(&[ROSTER_CACHE_NAME])
                    .inc();
                return Ok(roster);
            }
            tracing::warn!("Discarding undecodable cached team roster");
        }
        CACHE_MISSES_TOTAL
            .with_label_values(&[ROSTER_CACHE_NAME])
            .inc();
        self.refresh_roster(token).await
    }

    /// Fetch the roster from the provider and write it back to the cache.
    async fn refresh_roster(&self, token: &str) -> Result<TeamRoster> {
        let teams = self
            .github
            .list_org_teams(&self.organization, token)
            .await?;

        // Entries missing a name or id are unusable for membership checks
        let roster: TeamRoster = teams
            .into_iter()
            .filter_map(|team| Some((team.name?, team.id?)))
            .collect();

        let encoded =
            serde_json::to_string(&roster).map_err(|e| AppError::Internal(e.into()))?;
        self.store
            .set_with_ttl(&self.roster_key(), &encoded, self.roster_ttl)
            .await?;

        tracing::info!(
            org = %self.organization,
            teams = roster.len(),
            "Team roster refreshed"
        );
        Ok(roster)
    }

    /// Full membership snapshot: every roster team the user belongs to.
    ///
    /// Called once per successful callback; the result is carried in
    /// the session for the gate to check without further API calls.
    pub async fn member_teams(&self, username: &str, token: &str) -> Result<Vec<String>> {
        let roster = self.roster(token).await?;
        let mut teams = Vec::new();
        for (name, id) in &roster {
            if self.github.is_team_member(*id, username, token).await? {
                teams.push(name.clone());
            }
        }
        Ok(teams)
    }

    /// Check a single team membership by team name.
    ///
    /// Refetches the roster once if the name is absent, since a
    /// just-created team may postdate the cache. A name that still
    /// resolves to nothing is a plain non-member, with no membership
    /// API call.
    pub async fn is_member_of(
        &self,
        username: &str,
        team_name: &str,
        token: &str,
    ) -> Result<bool> {
        let roster = self.roster(token).await?;
        let team_id = match roster.get(team_name) {
            Some(id) => *id,
            None => {
                let refreshed = self.refresh_roster(token).await?;
                match refreshed.get(team_name) {
                    Some(id) => *id,
                    None => return Ok(false),
                }
            }
        };
        self.github.is_team_member(team_id, username, token).await
    }

    /// Run the full post-exchange resolution: username, organization
    /// gate, then the team snapshot.
    ///
    /// A user outside the organization is denied here; the identity is
    /// never persisted for them.
    pub async fn resolve(&self, token: &str) -> Result<Identity> {
        let username = self.github.fetch_username(token).await?;

        if !self
            .github
            .is_org_member(&self.organization, &username, token)
            .await?
        {
            LOGINS_TOTAL.with_label_values(&["denied_not_member"]).inc();
            tracing::warn!(
                user = %username,
                org = %self.organization,
                "Login denied: not an organization member"
            );
            return Err(AppError::UpstreamAuth(format!(
                "{} is not a member of {}",
                username, self.organization
            )));
        }

        let teams = self.member_teams(&username, token).await?;
        tracing::info!(user = %username, teams = teams.len(), "Identity resolved");
        Ok(Identity::new(username, teams, self.session_max_age))
    }

    /// Persist the access token for later revalidation without
    /// re-authenticating. No TTL: the provider never tells us when the
    /// token dies, so a revoked credential surfaces as an API error on
    /// next use.
    pub async fn remember_token(&self, username: &str, token: &str) -> Result<()> {
        self.store.set(&Self::token_key(username), token).await
    }

    /// The stored access token for a user, if any.
    pub async fn stored_token(&self, username: &str) -> Result<Option<String>> {
        self.store.get(&Self::token_key(username)).await
    }

    /// Drop the stored access token (logout path).
    pub async fn forget_token(&self, username: &str) -> Result<()> {
        self.store.delete(&Self::token_key(username)).await?;
        Ok(())
    }
}
