//! Key store operations over a [`KeyRepository`]

use chrono::Local;
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::{info, warn};

use super::models::{
    ApiKeyRecord, KeyDocument, KeyListing, KeyStoreSnapshot, MaskedKey, RateLimitConfig,
};
use super::repository::{KeyRepository, KeyStoreError};
use super::token::{fingerprint, generate_key};

/// Key returned by [`KeyStore::create`]; the only time the plaintext is exposed
#[derive(Debug, Clone)]
pub struct CreatedKey {
    pub key: String,
    pub name: String,
    pub active: bool,
}

/// Fields an update may change; `None` leaves the field alone
#[derive(Debug, Clone, Default)]
pub struct KeyUpdate {
    pub active: Option<bool>,
    pub name: Option<String>,
}

/// Single source of truth for which keys are valid
pub struct KeyStore {
    repo: Box<dyn KeyRepository>,
    /// Applied when the document is absent or has no rate-limit section
    default_rate_limit: RateLimitConfig,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl KeyStore {
    pub fn new(repo: Box<dyn KeyRepository>, default_rate_limit: RateLimitConfig) -> Self {
        Self {
            repo,
            default_rate_limit,
            write_lock: Mutex::new(()),
        }
    }

    /// Build the authorization snapshot from the persisted document
    pub fn load(&self) -> Result<KeyStoreSnapshot, KeyStoreError> {
        match self.repo.load()? {
            Some(document) => Ok(self.snapshot_of(&document)),
            None => {
                warn!("API key document not found");
                warn!("Running without authentication - NOT RECOMMENDED FOR PRODUCTION");
                Ok(KeyStoreSnapshot::empty(self.default_rate_limit))
            }
        }
    }

    fn snapshot_of(&self, document: &KeyDocument) -> KeyStoreSnapshot {
        let super_user_key = document
            .super_user
            .as_ref()
            .filter(|su| !su.key.is_empty())
            .map(|su| {
                info!(name = %su.name, "Loaded super user");
                su.key.clone()
            });

        let mut keys = HashSet::new();
        for record in document.api_keys.iter().filter(|r| r.active) {
            if super_user_key.as_deref() == Some(record.key.as_str()) {
                warn!(
                    name = %record.name,
                    "API key equals the super user key; excluded from regular keys"
                );
                continue;
            }
            keys.insert(record.key.clone());
        }

        let rate_limit = document.rate_limit.unwrap_or(self.default_rate_limit);

        info!(
            active_keys = keys.len(),
            total_keys = document.api_keys.len(),
            super_user = super_user_key.is_some(),
            requests_per_minute = rate_limit.requests_per_minute,
            requests_per_hour = rate_limit.requests_per_hour,
            "Loaded API keys"
        );

        KeyStoreSnapshot {
            keys,
            super_user_key,
            rate_limit,
        }
    }

    /// Generate, persist and return a new key
    pub fn create(&self, name: &str, active: bool) -> Result<CreatedKey, KeyStoreError> {
        let _guard = self.write_lock.lock();

        let mut document = self
            .repo
            .load()?
            .unwrap_or_else(|| KeyDocument::with_rate_limit(self.default_rate_limit));

        let mut key = generate_key();
        while document.api_keys.iter().any(|r| r.key == key) {
            key = generate_key();
        }

        document.api_keys.push(ApiKeyRecord {
            key: key.clone(),
            name: name.to_string(),
            created: Some(Local::now().format("%Y-%m-%d").to_string()),
            active,
        });
        self.repo.save(&document)?;

        info!(name = %name, key = %fingerprint(&key), active, "Created new API key");

        Ok(CreatedKey {
            key,
            name: name.to_string(),
            active,
        })
    }

    /// Mutate the first record whose key starts with `key_prefix`
    pub fn update(&self, key_prefix: &str, update: KeyUpdate) -> Result<(), KeyStoreError> {
        let _guard = self.write_lock.lock();

        let not_found = || KeyStoreError::NotFound(key_prefix.to_string());
        let mut document = self.repo.load()?.ok_or_else(not_found)?;

        let record = document
            .api_keys
            .iter_mut()
            .find(|r| r.key.starts_with(key_prefix))
            .ok_or_else(not_found)?;

        if let Some(active) = update.active {
            record.active = active;
        }
        if let Some(name) = update.name {
            record.name = name;
        }
        info!(name = %record.name, active = record.active, "Updated API key");

        self.repo.save(&document)
    }

    /// Remove every record whose key starts with `key_prefix`
    pub fn delete(&self, key_prefix: &str) -> Result<usize, KeyStoreError> {
        let _guard = self.write_lock.lock();

        let not_found = || KeyStoreError::NotFound(key_prefix.to_string());
        let mut document = self.repo.load()?.ok_or_else(not_found)?;

        let before = document.api_keys.len();
        document.api_keys.retain(|r| !r.key.starts_with(key_prefix));
        let removed = before - document.api_keys.len();
        if removed == 0 {
            return Err(not_found());
        }

        self.repo.save(&document)?;
        warn!(removed, "Deleted API keys by prefix");
        Ok(removed)
    }

    /// Masked view of every record
    pub fn list(&self) -> Result<KeyListing, KeyStoreError> {
        let document = self.repo.load()?;
        Ok(match document {
            Some(document) => KeyListing {
                keys: document.api_keys.iter().map(MaskedKey::from).collect(),
                rate_limit: document.rate_limit.unwrap_or(self.default_rate_limit),
            },
            None => KeyListing {
                keys: Vec::new(),
                rate_limit: self.default_rate_limit,
            },
        })
    }
}
