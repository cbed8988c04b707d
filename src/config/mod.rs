//! Configuration module for the conversion service

use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};
use std::path::PathBuf;

use crate::keys::RateLimitConfig;

/// Main application settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub keys: KeySettings,
    pub rate_limit: RateLimitConfig,
    pub render: RenderSettings,
    pub version: VersionSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub debug: bool,
    /// Largest accepted request body, in bytes
    pub max_body_bytes: usize,
}

/// Location of the persisted key document
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeySettings {
    pub path: PathBuf,
}

/// External converter invocation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub command: String,
    /// Extra arguments placed before the generated layout flags
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VersionSettings {
    pub path: PathBuf,
}

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration priority (highest to lowest):
    /// 1. `PORT` / `DEBUG` environment variables
    /// 2. Environment variables (prefixed with PDFGATE_)
    /// 3. config/local.toml (gitignored)
    /// 4. config/default.toml
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        let debug = std::env::var("DEBUG")
            .ok()
            .map(|v| v.eq_ignore_ascii_case("true"));

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // PDFGATE_SERVER__PORT, PDFGATE_RATE_LIMIT__REQUESTS_PER_MINUTE, ...
            .add_source(
                Environment::with_prefix("PDFGATE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
            )
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option("server.debug", debug)?;

        builder.build()?.try_deserialize()
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "0.0.0.0".to_string(),
            port: 5000,
            workers: None,
            debug: false,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Default for KeySettings {
    fn default() -> Self {
        KeySettings {
            path: PathBuf::from(".api-keys.json"),
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            command: "wkhtmltopdf".to_string(),
            args: vec!["--quiet".to_string()],
            timeout_secs: 60,
        }
    }
}

impl Default for VersionSettings {
    fn default() -> Self {
        VersionSettings {
            path: PathBuf::from("version.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_open_deployment() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.server.max_body_bytes, 16 * 1024 * 1024);
        assert_eq!(settings.rate_limit.requests_per_minute, 60);
        assert_eq!(settings.rate_limit.requests_per_hour, 1000);
        assert_eq!(settings.keys.path, PathBuf::from(".api-keys.json"));
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let settings: Settings = Config::builder()
            .add_source(config::File::from_str(
                "[server]\nport = 9090\n[rate_limit]\nrequests_per_minute = 5\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.rate_limit.requests_per_minute, 5);
        assert_eq!(settings.rate_limit.requests_per_hour, 1000);
        assert_eq!(settings.render.command, "wkhtmltopdf");
    }
}
