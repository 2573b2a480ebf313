//! CSRF state tokens
//!
//! Single-use, time-bound opaque tokens embedded in the OAuth
//! authorization URL and echoed back on the callback. Validation
//! deletes the key, so a token is accepted at most once; replays and
//! expired tokens both fail closed.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;
use std::sync::Arc;

use crate::error::Result;
use crate::metrics::{STATE_TOKENS_ISSUED_TOTAL, STATE_VALIDATIONS_TOTAL};
use crate::store::KeyValueStore;

const STATE_KEY_PREFIX: &str = "state:";

/// Issues and consumes CSRF state tokens over the shared store.
#[derive(Clone)]
pub struct CsrfStore {
    store: Arc<dyn KeyValueStore>,
    ttl_seconds: i64,
}

impl CsrfStore {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl_seconds: i64) -> Self {
        Self { store, ttl_seconds }
    }

    /// Generate a fresh state token and record it with the configured TTL.
    ///
    /// 32 random bytes, base64url without padding: 256 bits of entropy.
    pub async fn issue(&self) -> Result<String> {
        let token = {
            let mut bytes = [0u8; 32];
            rand::thread_rng().fill(&mut bytes);
            URL_SAFE_NO_PAD.encode(bytes)
        };

        self.store
            .set_with_ttl(&format!("{STATE_KEY_PREFIX}{token}"), "1", self.ttl_seconds)
            .await?;

        STATE_TOKENS_ISSUED_TOTAL.inc();
        tracing::debug!("Issued OAuth state token");
        Ok(token)
    }

    /// Validate a token, consuming it.
    ///
    /// Returns true exactly once per issued token. Unknown, expired,
    /// and replayed tokens all return false; only a store failure is
    /// an error.
    pub async fn consume(&self, token: &str) -> Result<bool> {
        let valid = self
            .store
            .delete(&format!("{STATE_KEY_PREFIX}{token}"))
            .await?;

        let outcome = if valid { "valid" } else { "rejected" };
        STATE_VALIDATIONS_TOTAL.with_label_values(&[outcome]).inc();
        if !valid {
            tracing::warn!("OAuth state token rejected");
        }
        Ok(valid)
    }
}
