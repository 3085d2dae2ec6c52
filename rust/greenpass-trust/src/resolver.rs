// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Key id -> issuer key resolution strategies.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use greenpass_validation::TrustKey;
use tracing::{debug, info, warn};

use crate::cache::{key_file_name, CacheDir};
use crate::error::TrustError;
use crate::http::HttpClient;
use crate::sources::{DgcKeySource, KeySource, NhsKeySource};

pub trait KeyResolver: Send + Sync {
    /// The raw key material published for `key_id`.
    fn resolve_raw(&self, key_id: &[u8]) -> Result<Vec<u8>, TrustError>;

    fn resolve_key(&self, key_id: &[u8]) -> Result<TrustKey, TrustError> {
        let raw = self.resolve_raw(key_id)?;
        Ok(TrustKey::from_key_material(key_id, &raw)?)
    }
}

/// Queries each source in order; the first one that knows the key id wins.
pub struct OnlineKeyResolver {
    sources: Vec<Box<dyn KeySource>>,
}

impl OnlineKeyResolver {
    pub fn new(sources: Vec<Box<dyn KeySource>>) -> Self {
        Self { sources }
    }

    /// NHS first, then DGC over the resume protocol.
    pub fn nhs_then_dgc(http: HttpClient, nhs_base_url: &str, dgc_base_url: &str) -> Self {
        Self::new(vec![
            Box::new(NhsKeySource::new(http.clone(), nhs_base_url)),
            Box::new(DgcKeySource::resume(http, dgc_base_url)),
        ])
    }
}

impl KeyResolver for OnlineKeyResolver {
    fn resolve_raw(&self, key_id: &[u8]) -> Result<Vec<u8>, TrustError> {
        for source in &self.sources {
            if let Some(raw) = source.find_key(key_id)? {
                info!(source = source.name(), "issuer key resolved");
                return Ok(raw);
            }
            debug!(source = source.name(), "key id not published");
        }
        Err(TrustError::UnknownCertificationAuthority {
            key_id: base64::engine::general_purpose::STANDARD.encode(key_id),
        })
    }
}

/// Serves keys from the cache directory, filling it from `inner` on a miss.
pub struct CachedKeyResolver<R> {
    inner: R,
    cache: CacheDir,
}

impl<R: KeyResolver> CachedKeyResolver<R> {
    pub fn new(inner: R, cache: CacheDir) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &CacheDir {
        &self.cache
    }
}

impl<R: KeyResolver> KeyResolver for CachedKeyResolver<R> {
    fn resolve_raw(&self, key_id: &[u8]) -> Result<Vec<u8>, TrustError> {
        let name = key_file_name(key_id);
        if let Some(raw) = self.cache.read(&name)? {
            if !raw.is_empty() {
                debug!(file = %name, "key cache hit");
                return Ok(raw);
            }
        }
        let raw = self.inner.resolve_raw(key_id)?;
        store_key(&self.cache, &name, &raw);
        Ok(raw)
    }

    fn resolve_key(&self, key_id: &[u8]) -> Result<TrustKey, TrustError> {
        let name = key_file_name(key_id);
        if let Some(raw) = self.cache.read(&name)? {
            match TrustKey::from_key_material(key_id, &raw) {
                Ok(key) => {
                    debug!(file = %name, "key cache hit");
                    return Ok(key);
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "discarding corrupt cached key");
                    self.cache.remove(&name)?;
                }
            }
        }

        let raw = self.inner.resolve_raw(key_id)?;
        let key = TrustKey::from_key_material(key_id, &raw)?;
        store_key(&self.cache, &name, &raw);
        Ok(key)
    }
}

// A failed write only costs a refetch next time.
fn store_key(cache: &CacheDir, name: &str, raw: &[u8]) {
    if let Err(e) = cache.write(name, raw) {
        warn!(error = %e, "could not cache issuer key");
    }
}

/// Always answers with the key in a local PEM or DER file, whatever the key id.
#[derive(Debug, Clone)]
pub struct ForcedKeyResolver {
    path: PathBuf,
}

impl ForcedKeyResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyResolver for ForcedKeyResolver {
    fn resolve_raw(&self, _key_id: &[u8]) -> Result<Vec<u8>, TrustError> {
        let bytes = std::fs::read(&self.path).map_err(|e| TrustError::KeyFile {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        if bytes.starts_with(b"-----BEGIN") {
            let (_, pem) = x509_parser::pem::parse_x509_pem(&bytes).map_err(|e| TrustError::KeyFile {
                path: self.path.display().to_string(),
                reason: format!("bad PEM: {e}"),
            })?;
            return Ok(pem.contents);
        }
        Ok(bytes)
    }
}
