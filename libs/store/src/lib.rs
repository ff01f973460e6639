//! Single-document JSON persistence
//!
//! Each persisted store in the pipeline is one structured JSON document at
//! a configured path (an array for anomalies, an object for stats and
//! health). Writes are whole-document replace, performed atomically:
//! serialize → write temp file → fsync → rename.
//!
//! Every store has exactly one writer component; readers only ever `load`.

use std::fs::{self, File};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ── Document store ──────────────────────────────────────────────────

/// A single JSON document at a fixed path.
///
/// `load` distinguishes "no document yet" (`Ok(None)`) from a real IO or
/// parse failure, so callers can surface an explicit not-found condition.
pub struct DocumentStore<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DocumentStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a document has ever been written.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the current document, or `None` if none has been written yet.
    pub fn load(&self) -> Result<Option<T>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        let doc = serde_json::from_slice(&bytes)?;
        Ok(Some(doc))
    }

    /// Read the current document, falling back to `default` if none exists.
    pub fn load_or_else(&self, default: impl FnOnce() -> T) -> Result<T, StoreError> {
        Ok(self.load()?.unwrap_or_else(default))
    }

    /// Replace the document atomically: write to a temp file in the same
    /// directory, fsync, then rename over the target.
    pub fn save(&self, doc: &T) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(doc)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), bytes = data.len(), "document saved");
        Ok(())
    }
}
