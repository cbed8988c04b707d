//! Credential extraction
//!
//! Regular keys arrive in `X-API-Key`, the super user key in
//! `X-Super-User-Key`. The two headers are never interchangeable.

use actix_web::{dev::ServiceRequest, HttpMessage};

/// Extension stored on requests admitted with a regular key
#[derive(Clone, Debug)]
pub struct AuthenticatedKey {
    /// Log-safe fingerprint of the key
    pub key_id: String,
}

/// Read a credential header; non-UTF-8 values count as absent
pub fn extract_credential(req: &ServiceRequest, header: &str) -> Option<String> {
    req.headers()
        .get(header)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
}

/// Access to the authenticated key from handlers
pub trait ApiKeyExt {
    fn api_key(&self) -> Option<AuthenticatedKey>;
}

impl<T: HttpMessage> ApiKeyExt for T {
    fn api_key(&self) -> Option<AuthenticatedKey> {
        self.extensions().get::<AuthenticatedKey>().cloned()
    }
}
