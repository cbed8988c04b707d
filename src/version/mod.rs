//! Service version and changelog

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};
use utoipa::ToSchema;

pub const SERVICE_NAME: &str = "HTML-to-PDF API";
pub const UPDATED_AT: &str = "2026-01-05T00:00:00Z";

/// Contents of `version.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VersionInfo {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_updated_at")]
    pub updated_at: String,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub changelog: Vec<serde_json::Value>,
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_name() -> String {
    SERVICE_NAME.to_string()
}

fn default_updated_at() -> String {
    UPDATED_AT.to_string()
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: default_name(),
            updated_at: default_updated_at(),
            changelog: Vec::new(),
        }
    }
}

impl VersionInfo {
    /// Read `path`, falling back to built-in values when absent or unreadable
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str::<VersionInfo>(&raw).map_err(|e| e.to_string()))
        {
            Ok(info) => {
                info!(version = %info.version, "Loaded version file");
                info
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Error loading version file");
                Self::default()
            }
        }
    }
}
