//! Durable storage for the key document

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use super::models::KeyDocument;

/// Key storage errors
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed key document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No key found with prefix: {0}")]
    NotFound(String),
}

/// Load/save contract for the persisted key document
pub trait KeyRepository: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet
    fn load(&self) -> Result<Option<KeyDocument>, KeyStoreError>;

    /// Replace the persisted document as a whole
    fn save(&self, document: &KeyDocument) -> Result<(), KeyStoreError>;
}

/// Key document stored as pretty-printed JSON on the local filesystem
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> KeyStoreError {
        KeyStoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Write to a sibling temp file, fsync, then rename over the target
    fn write_atomic(&self, data: &[u8]) -> Result<(), KeyStoreError> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "keys.json".to_string());
        let temp_path = self
            .path
            .with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4().simple()));

        let result = (|| -> std::io::Result<()> {
            let mut options = OpenOptions::new();
            options.write(true).create_new(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }
            let mut file = options.open(&temp_path)?;
            file.write_all(data)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
            drop(file);
            fs::rename(&temp_path, &self.path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(self.io_error(&self.path, e));
        }

        #[cfg(unix)]
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }
}

impl KeyRepository for JsonFileRepository {
    fn load(&self) -> Result<Option<KeyDocument>, KeyStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Key document not found");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(&self.path, e)),
        };

        let document = serde_json::from_str(&raw)?;
        Ok(Some(document))
    }

    fn save(&self, document: &KeyDocument) -> Result<(), KeyStoreError> {
        let data = serde_json::to_vec_pretty(document)?;
        self.write_atomic(&data)?;

        info!(
            path = %self.path.display(),
            keys = document.api_keys.len(),
            "Key document saved"
        );
        Ok(())
    }
}
