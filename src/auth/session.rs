//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed: the identity, including the
//! team snapshot taken at login, rides along in the cookie. The raw
//! access token never goes in the cookie; it lives in the shared store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Cookie name the session token is stored under.
pub const SESSION_COOKIE: &str = "session";

/// Resolved user identity
///
/// Stored in a signed cookie. The team set is the membership snapshot
/// taken at callback time; route gating is a pure set check against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// GitHub username
    pub user: String,
    /// Teams the user belonged to at login
    pub teams: Vec<String>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session expires
    pub expires_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(user: String, teams: Vec<String>, max_age_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            user,
            teams,
            created_at: now,
            expires_at: now + Duration::seconds(max_age_seconds),
        }
    }

    /// Check if the session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    pub fn has_team(&self, team: &str) -> bool {
        self.teams.iter().any(|t| t == team)
    }
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
pub fn create_session_token(
    identity: &Identity,
    secret: &str,
) -> Result<String, crate::error::AppError> {
    use base64::{engine::general_purpose, Engine as _};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let payload = serde_json::to_string(identity)
        .map_err(|e| crate::error::AppError::Internal(e.into()))?;

    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Internal(anyhow::anyhow!(e)))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// Returns `None` for any malformed, tampered, or expired token; the
/// caller treats all of those as an anonymous request, not an error.
pub fn verify_session_token(token: &str, secret: &str) -> Option<Identity> {
    use base64::{engine::general_purpose, Engine as _};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let (payload_b64, signature_b64) = token.split_once('.')?;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload_b64.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .ok()?;
    mac.verify_slice(&expected_signature).ok()?;

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
    let payload_str = String::from_utf8(payload_bytes).ok()?;
    let identity: Identity = serde_json::from_str(&payload_str).ok()?;

    if identity.is_expired() {
        return None;
    }

    Some(identity)
}
