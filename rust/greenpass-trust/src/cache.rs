// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! On-disk cache for issuer keys, verification settings and device names.
//!
//! Keys are stored as the raw bytes the trust source published, one file per
//! key id. Settings and device names are stored as JSON blobs named
//! `settings` and `tests`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::TrustError;

pub const SETTINGS_BLOB: &str = "settings";
pub const DEVICE_NAMES_BLOB: &str = "tests";

#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    /// Open (creating if needed) a cache rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, TrustError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| cache_error(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// `Ok(None)` when the entry does not exist.
    pub fn read(&self, name: &str) -> Result<Option<Vec<u8>>, TrustError> {
        let path = self.path_of(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(cache_error(&path, e)),
        }
    }

    pub fn write(&self, name: &str, bytes: &[u8]) -> Result<(), TrustError> {
        let path = self.path_of(name);
        fs::write(&path, bytes).map_err(|e| cache_error(&path, e))
    }

    pub fn remove(&self, name: &str) -> Result<(), TrustError> {
        let path = self.path_of(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(cache_error(&path, e)),
        }
    }

    /// Delete every cached entry, keeping the directory itself.
    pub fn clear(&self) -> Result<usize, TrustError> {
        let entries = fs::read_dir(&self.root).map_err(|e| cache_error(&self.root, e))?;
        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| cache_error(&self.root, e))?;
            let path = entry.path();
            if path.is_file() {
                fs::remove_file(&path).map_err(|e| cache_error(&path, e))?;
                removed += 1;
            }
        }
        debug!(root = %self.root.display(), removed, "cache cleared");
        Ok(removed)
    }

    /// Load a JSON blob, or fetch and persist it when missing or corrupt.
    pub fn load_or_fetch_json<T, F>(&self, name: &str, fetch: F) -> Result<T, TrustError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, TrustError>,
    {
        if let Some(bytes) = self.read(name)? {
            match serde_json::from_slice::<T>(&bytes) {
                Ok(v) => {
                    debug!(name, "cache hit");
                    return Ok(v);
                }
                Err(e) => {
                    warn!(name, error = %e, "discarding corrupt cache entry");
                    self.remove(name)?;
                }
            }
        }

        let value = fetch()?;
        let bytes = serde_json::to_vec(&value).map_err(|e| TrustError::Cache {
            path: self.path_of(name).display().to_string(),
            reason: e.to_string(),
        })?;
        self.write(name, &bytes)?;
        Ok(value)
    }
}

/// File name for a cached key: the key id in unpadded URL-safe base64.
pub fn key_file_name(key_id: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(key_id)
}

fn cache_error(path: &Path, e: std::io::Error) -> TrustError {
    TrustError::Cache {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}
