//! Key document models

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;

use super::token::mask_key;

/// Persisted record for a regular API key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default)]
    pub active: bool,
}

/// The distinguished administrator credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperUser {
    pub key: String,
    #[serde(default)]
    pub name: String,
}

/// Request budget shared by every regular key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub requests_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            requests_per_hour: 1000,
        }
    }
}

/// The whole persisted key document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_user: Option<SuperUser>,
    #[serde(default)]
    pub api_keys: Vec<ApiKeyRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,
}

impl KeyDocument {
    /// Empty document carrying an explicit rate-limit section
    pub fn with_rate_limit(rate_limit: RateLimitConfig) -> Self {
        Self {
            super_user: None,
            api_keys: Vec::new(),
            rate_limit: Some(rate_limit),
        }
    }
}

/// Immutable view of the key document used to authorize requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStoreSnapshot {
    /// Active regular keys only
    pub keys: HashSet<String>,
    pub super_user_key: Option<String>,
    pub rate_limit: RateLimitConfig,
}

impl KeyStoreSnapshot {
    /// Snapshot with no credentials configured at all
    pub fn empty(rate_limit: RateLimitConfig) -> Self {
        Self {
            keys: HashSet::new(),
            super_user_key: None,
            rate_limit,
        }
    }

    pub fn auth_disabled(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Listing entry; the plaintext key never leaves the store
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MaskedKey {
    pub name: String,
    /// First 8 and last 4 characters of the key
    pub key_preview: String,
    /// Creation date (`YYYY-MM-DD`), `Unknown` when the record has none
    pub created: String,
    pub active: bool,
}

impl From<&ApiKeyRecord> for MaskedKey {
    fn from(record: &ApiKeyRecord) -> Self {
        Self {
            name: record.name.clone(),
            key_preview: mask_key(&record.key),
            created: record
                .created
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            active: record.active,
        }
    }
}

/// Result of listing the key document
#[derive(Debug, Clone)]
pub struct KeyListing {
    pub keys: Vec<MaskedKey>,
    pub rate_limit: RateLimitConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_parses_original_layout() {
        let raw = r#"{
            "super_user": { "key": "root-secret", "name": "Ops" },
            "api_keys": [
                {"key": "abcdefghijklmnop", "name": "Client A", "created": "2025-01-05", "active": true},
                {"key": "zyxwvutsrqponmlk", "name": "Client B", "active": false}
            ],
            "rate_limit": { "requests_per_minute": 10, "requests_per_hour": 100 }
        }"#;

        let doc: KeyDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.super_user.as_ref().unwrap().name, "Ops");
        assert_eq!(doc.api_keys.len(), 2);
        assert_eq!(doc.api_keys[0].created.as_deref(), Some("2025-01-05"));
        assert!(doc.api_keys[1].created.is_none());
        assert_eq!(doc.rate_limit.unwrap().requests_per_hour, 100);
    }

    #[test]
    fn test_missing_active_flag_means_inactive() {
        let record: ApiKeyRecord =
            serde_json::from_str(r#"{"key": "k", "name": "n"}"#).unwrap();
        assert!(!record.active);
    }

    #[test]
    fn test_masked_key_hides_middle() {
        let record = ApiKeyRecord {
            key: "abcdefgh_MIDDLE_SECRET_wxyz".to_string(),
            name: "Client".to_string(),
            created: None,
            active: true,
        };
        let masked = MaskedKey::from(&record);
        assert_eq!(masked.key_preview, "abcdefgh...wxyz");
        assert_eq!(masked.created, "Unknown");
    }
}
