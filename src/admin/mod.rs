//! Key administration
//!
//! Super-user operations over the key store. Every successful mutation is
//! followed by an explicit reload of the auth gate so the change applies to
//! the very next request. Write and reload happen under one lock, so
//! snapshots reach the gate in the order their writes were made.

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::gate::Gatekeeper;
use crate::keys::{CreatedKey, KeyListing, KeyStore, KeyStoreError, KeyUpdate};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{0}")]
    BadRequest(String),
    #[error("No key found with prefix: {0}")]
    NotFound(String),
    #[error("Key storage failed: {0}")]
    Storage(KeyStoreError),
}

impl From<KeyStoreError> for AdminError {
    fn from(e: KeyStoreError) -> Self {
        match e {
            KeyStoreError::NotFound(prefix) => AdminError::NotFound(prefix),
            other => AdminError::Storage(other),
        }
    }
}

#[derive(Clone)]
pub struct KeyAdmin {
    store: Arc<KeyStore>,
    gate: Arc<Gatekeeper>,
    /// Held from the store write until the gate has the new snapshot
    mutation: Arc<Mutex<()>>,
}

impl KeyAdmin {
    pub fn new(store: Arc<KeyStore>, gate: Arc<Gatekeeper>) -> Self {
        Self {
            store,
            gate,
            mutation: Arc::new(Mutex::new(())),
        }
    }

    pub fn list(&self) -> Result<KeyListing, AdminError> {
        Ok(self.store.list()?)
    }

    pub fn create(&self, name: Option<&str>, active: bool) -> Result<CreatedKey, AdminError> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AdminError::BadRequest("Key name is required".to_string()))?;

        let _guard = self.mutation.lock();
        let created = self.store.create(name, active)?;
        self.reload()?;
        Ok(created)
    }

    pub fn update(&self, key_prefix: &str, update: KeyUpdate) -> Result<(), AdminError> {
        validate_prefix(key_prefix)?;
        if update.active.is_none() && update.name.is_none() {
            return Err(AdminError::BadRequest(
                "Request body must set active or name".to_string(),
            ));
        }
        if matches!(update.name.as_deref(), Some(n) if n.trim().is_empty()) {
            return Err(AdminError::BadRequest("Key name must not be empty".to_string()));
        }

        let _guard = self.mutation.lock();
        self.store.update(key_prefix, update)?;
        self.reload()
    }

    /// Returns how many records were removed
    pub fn delete(&self, key_prefix: &str) -> Result<usize, AdminError> {
        validate_prefix(key_prefix)?;
        let _guard = self.mutation.lock();
        let removed = self.store.delete(key_prefix)?;
        self.reload()?;
        Ok(removed)
    }

    /// Only called after a confirmed successful write, with `mutation` held
    fn reload(&self) -> Result<(), AdminError> {
        let snapshot = self.store.load().map_err(|e| {
            error!(error = %e, "Failed to reload keys after update");
            AdminError::Storage(e)
        })?;
        self.gate.reload(snapshot);
        Ok(())
    }
}

fn validate_prefix(key_prefix: &str) -> Result<(), AdminError> {
    if key_prefix.is_empty() {
        return Err(AdminError::BadRequest("Key prefix is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{Access, GateError};
    use crate::keys::models::KeyDocument;
    use crate::keys::repository::KeyRepository;
    use crate::keys::store::tests::{memory_store, MemoryRepository};
    use crate::keys::{KeyStoreError, RateLimitConfig};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Once armed, the load that follows the next save returns its document
    /// only after a pause, like a slow disk behind a concurrent writer
    struct SlowReloadRepository {
        inner: Arc<MemoryRepository>,
        armed: AtomicBool,
        stall_next_load: AtomicBool,
    }

    impl KeyRepository for Arc<SlowReloadRepository> {
        fn load(&self) -> Result<Option<KeyDocument>, KeyStoreError> {
            let document = self.inner.load()?;
            if self.stall_next_load.swap(false, Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(300));
            }
            Ok(document)
        }

        fn save(&self, document: &KeyDocument) -> Result<(), KeyStoreError> {
            self.inner.save(document)?;
            if self.armed.swap(false, Ordering::SeqCst) {
                self.stall_next_load.store(true, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    fn admin_with(document: Option<KeyDocument>) -> (KeyAdmin, Arc<Gatekeeper>, Arc<MemoryRepository>) {
        let (store, repo) = memory_store(document);
        let gate = Arc::new(Gatekeeper::new(store.load().unwrap()));
        (KeyAdmin::new(Arc::new(store), gate.clone()), gate, repo)
    }

    #[test]
    fn test_create_requires_name() {
        let (admin, _, _) = admin_with(None);
        assert!(matches!(admin.create(None, true), Err(AdminError::BadRequest(_))));
        assert!(matches!(admin.create(Some("  "), true), Err(AdminError::BadRequest(_))));
    }

    #[test]
    fn test_created_key_usable_without_restart() {
        let (admin, gate, _) = admin_with(None);
        let created = admin.create(Some("Client A"), true).unwrap();

        assert!(matches!(
            gate.check_api_key(Some(&created.key)),
            Ok(Access::Granted { .. })
        ));
        assert_eq!(gate.check_api_key(None), Err(GateError::Unauthenticated {
            header: crate::gate::API_KEY_HEADER
        }));
    }

    #[test]
    fn test_deactivation_applies_to_next_request() {
        let (admin, gate, _) = admin_with(None);
        let keep = admin.create(Some("keep"), true).unwrap();
        let victim = admin.create(Some("victim"), true).unwrap();
        assert!(gate.check_api_key(Some(&victim.key)).is_ok());

        admin
            .update(&victim.key[..12], KeyUpdate { active: Some(false), name: None })
            .unwrap();

        assert_eq!(gate.check_api_key(Some(&victim.key)), Err(GateError::Forbidden));
        assert!(gate.check_api_key(Some(&keep.key)).is_ok());
    }

    #[test]
    fn test_update_validation() {
        let (admin, _, _) = admin_with(None);
        let created = admin.create(Some("a"), true).unwrap();

        assert!(matches!(
            admin.update(&created.key, KeyUpdate::default()),
            Err(AdminError::BadRequest(_))
        ));
        assert!(matches!(
            admin.update(&created.key, KeyUpdate { active: None, name: Some(String::new()) }),
            Err(AdminError::BadRequest(_))
        ));
        assert!(matches!(
            admin.update("", KeyUpdate { active: Some(true), name: None }),
            Err(AdminError::BadRequest(_))
        ));
        assert!(matches!(
            admin.update("no-such-prefix", KeyUpdate { active: Some(true), name: None }),
            Err(AdminError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_then_key_rejected() {
        let (admin, gate, _) = admin_with(None);
        let a = admin.create(Some("a"), true).unwrap();
        let b = admin.create(Some("b"), true).unwrap();

        assert_eq!(admin.delete(&a.key).unwrap(), 1);
        assert_eq!(gate.check_api_key(Some(&a.key)), Err(GateError::Forbidden));
        assert!(gate.check_api_key(Some(&b.key)).is_ok());
        assert!(matches!(admin.delete(&a.key), Err(AdminError::NotFound(_))));
    }

    #[test]
    fn test_failed_write_does_not_reload() {
        let (admin, gate, repo) = admin_with(None);
        let a = admin.create(Some("a"), true).unwrap();
        let before = gate.snapshot();

        repo.fail_writes.store(true, Ordering::SeqCst);
        assert!(matches!(admin.create(Some("b"), true), Err(AdminError::Storage(_))));
        assert!(matches!(admin.delete(&a.key), Err(AdminError::Storage(_))));

        assert_eq!(*gate.snapshot(), *before);
        assert!(gate.check_api_key(Some(&a.key)).is_ok());
    }

    #[test]
    fn test_concurrent_mutations_reach_gate_in_write_order() {
        let repo = Arc::new(SlowReloadRepository {
            inner: Arc::new(MemoryRepository::default()),
            armed: AtomicBool::new(false),
            stall_next_load: AtomicBool::new(false),
        });
        let store = KeyStore::new(Box::new(repo.clone()), RateLimitConfig::default());
        let gate = Arc::new(Gatekeeper::new(store.load().unwrap()));
        let admin = KeyAdmin::new(Arc::new(store), gate.clone());

        let keep = admin.create(Some("keep"), true).unwrap();
        let victim = admin.create(Some("victim"), true).unwrap();

        // The rename's reload reads its document, then stalls
        repo.armed.store(true, Ordering::SeqCst);
        let renamer = {
            let admin = admin.clone();
            let prefix = keep.key[..12].to_string();
            thread::spawn(move || {
                admin
                    .update(&prefix, KeyUpdate { active: None, name: Some("kept".to_string()) })
                    .unwrap()
            })
        };

        thread::sleep(Duration::from_millis(50));
        admin
            .update(&victim.key[..12], KeyUpdate { active: Some(false), name: None })
            .unwrap();
        assert_eq!(gate.check_api_key(Some(&victim.key)), Err(GateError::Forbidden));

        renamer.join().unwrap();
        assert_eq!(gate.check_api_key(Some(&victim.key)), Err(GateError::Forbidden));
        assert!(gate.check_api_key(Some(&keep.key)).is_ok());
    }
}
