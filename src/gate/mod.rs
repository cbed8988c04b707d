//! Authentication and rate-limiting gate
//!
//! [`Gatekeeper`] owns the current key snapshot and the per-key rate-limit
//! windows. It is built once at startup and shared by the auth middleware and
//! the key administration service, which reloads it after every mutation.

pub mod rate_limit;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::keys::{fingerprint, KeyStoreSnapshot};
pub use rate_limit::{Admission, Denial, SlidingWindowLimiter};

/// Header carrying a regular API key
pub const API_KEY_HEADER: &str = "X-API-Key";
/// Header carrying the super user key
pub const SUPER_USER_HEADER: &str = "X-Super-User-Key";

/// Reasons a request is stopped at the gate
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("Please provide {header} header")]
    Unauthenticated { header: &'static str },
    #[error("The provided key is not valid")]
    Forbidden,
    #[error("{}", .0.reason())]
    RateLimited(Denial),
    #[error("Super user key not configured")]
    NotConfigured,
}

/// Outcome of a successful regular-key check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// No keys configured; the request proceeds unauthenticated
    Open,
    Granted {
        /// Log-safe key identifier
        key_id: String,
        limit: u32,
        remaining: u32,
    },
}

pub struct Gatekeeper {
    snapshot: RwLock<Arc<KeyStoreSnapshot>>,
    limiter: SlidingWindowLimiter,
}

impl Gatekeeper {
    pub fn new(snapshot: KeyStoreSnapshot) -> Self {
        if snapshot.auth_disabled() {
            warn!("No API keys configured - /convert is open to unauthenticated requests");
        }
        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            limiter: SlidingWindowLimiter::new(),
        }
    }

    /// Current snapshot; stays consistent even if a reload happens meanwhile
    pub fn snapshot(&self) -> Arc<KeyStoreSnapshot> {
        self.snapshot.read().clone()
    }

    /// Swap in a freshly loaded snapshot
    pub fn reload(&self, snapshot: KeyStoreSnapshot) {
        let active_keys = snapshot.keys.len();
        *self.snapshot.write() = Arc::new(snapshot);
        info!(
            active_keys,
            tracked_keys = self.limiter.tracked_keys(),
            "Auth gate reloaded"
        );
    }

    #[cfg(test)]
    pub fn limiter(&self) -> &SlidingWindowLimiter {
        &self.limiter
    }

    /// Regular tier: key validity, then rate-limit admission
    pub fn check_api_key(&self, presented: Option<&str>) -> Result<Access, GateError> {
        self.check_api_key_at(presented, Instant::now())
    }

    pub fn check_api_key_at(
        &self,
        presented: Option<&str>,
        now: Instant,
    ) -> Result<Access, GateError> {
        let snapshot = self.snapshot();

        if snapshot.auth_disabled() {
            warn!("No API keys configured - running without authentication");
            return Ok(Access::Open);
        }

        let key = presented
            .filter(|k| !k.is_empty())
            .ok_or(GateError::Unauthenticated { header: API_KEY_HEADER })?;

        if !snapshot.keys.contains(key) {
            warn!(key = %fingerprint(key), "Invalid API key attempted");
            return Err(GateError::Forbidden);
        }

        match self.limiter.admit_at(key, &snapshot.rate_limit, now) {
            Admission::Allowed { limit, remaining } => {
                let key_id = fingerprint(key);
                debug!(key = %key_id, remaining, "API key admitted");
                Ok(Access::Granted {
                    key_id,
                    limit,
                    remaining,
                })
            }
            Admission::Denied(denial) => {
                warn!(
                    key = %fingerprint(key),
                    window = %denial.window,
                    limit = denial.limit,
                    "Rate limit exceeded"
                );
                Err(GateError::RateLimited(denial))
            }
        }
    }

    /// Super user tier; never rate limited
    pub fn check_super_user(&self, presented: Option<&str>) -> Result<(), GateError> {
        let snapshot = self.snapshot();

        let expected = match snapshot.super_user_key.as_deref() {
            Some(expected) => expected,
            None => {
                tracing::error!("Super user not configured");
                return Err(GateError::NotConfigured);
            }
        };

        let key = presented
            .filter(|k| !k.is_empty())
            .ok_or(GateError::Unauthenticated { header: SUPER_USER_HEADER })?;

        if !keys_match(key, expected) {
            warn!("Invalid super user key attempted");
            return Err(GateError::Forbidden);
        }

        debug!("Super user authenticated");
        Ok(())
    }
}

/// Compares digests so the comparison time does not depend on the secret
fn keys_match(presented: &str, expected: &str) -> bool {
    Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.as_bytes())
}
