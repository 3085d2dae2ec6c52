// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Verifier configuration.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use greenpass_trust::{
    join_url, CacheDir, CachedKeyResolver, DgcKeySource, ForcedKeyResolver, HttpClient, KeyResolver, KeySource,
    NhsKeySource, OnlineKeyResolver, DEFAULT_DEVICE_EXPORT_URL, DEFAULT_DGCG_BASE_URL, DEFAULT_DGC_BASE_URL,
    DEFAULT_NHS_BASE_URL, DEFAULT_TIMEOUT,
};
use tracing::info;

use crate::dates::parse_offset;
use crate::error::CertificateError;

/// How DGC signer certificates are looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DgcSource {
    /// `signercertificate/status` + `signercertificate/update` under the DGC base URL.
    Resume,
    /// A single trust-list page.
    TrustList { url: String },
}

#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub nhs_base_url: String,
    /// Also serves the settings endpoint.
    pub dgc_base_url: String,
    pub dgc_source: DgcSource,
    pub device_export_url: String,
    pub http_timeout: Duration,
    /// `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    /// Verify every certificate with this key file instead of resolving by key id.
    pub key_override: Option<PathBuf>,
    pub enforce_blocklist: bool,
    pub consider_recovery_expiration: bool,
    /// `None` means the current time.
    pub reference_time: Option<DateTime<Utc>>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            nhs_base_url: DEFAULT_NHS_BASE_URL.to_string(),
            dgc_base_url: DEFAULT_DGC_BASE_URL.to_string(),
            dgc_source: DgcSource::Resume,
            device_export_url: DEFAULT_DEVICE_EXPORT_URL.to_string(),
            http_timeout: DEFAULT_TIMEOUT,
            cache_dir: default_cache_dir(),
            key_override: None,
            enforce_blocklist: true,
            consider_recovery_expiration: false,
            reference_time: None,
        }
    }
}

/// `$HOME/.local/greenpass`.
pub fn default_cache_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("greenpass"))
}

/// The trust-list page published next to the DGCG base URL.
pub fn default_trust_list_url() -> String {
    join_url(DEFAULT_DGCG_BASE_URL, "trust-list").unwrap_or_else(|_| format!("{DEFAULT_DGCG_BASE_URL}trust-list"))
}

impl VerifierConfig {
    pub fn with_nhs_base_url(mut self, url: impl Into<String>) -> Self {
        self.nhs_base_url = url.into();
        self
    }

    pub fn with_dgc_base_url(mut self, url: impl Into<String>) -> Self {
        self.dgc_base_url = url.into();
        self
    }

    pub fn with_dgc_trust_list(mut self, url: impl Into<String>) -> Self {
        self.dgc_source = DgcSource::TrustList { url: url.into() };
        self
    }

    pub fn with_device_export_url(mut self, url: impl Into<String>) -> Self {
        self.device_export_url = url.into();
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache_dir = None;
        self
    }

    pub fn with_key_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_override = Some(path.into());
        self
    }

    pub fn with_blocklist(mut self, enforce: bool) -> Self {
        self.enforce_blocklist = enforce;
        self
    }

    pub fn with_recovery_expiration(mut self, consider: bool) -> Self {
        self.consider_recovery_expiration = consider;
        self
    }

    pub fn with_reference_time(mut self, at: DateTime<Utc>) -> Self {
        self.reference_time = Some(at);
        self
    }

    pub fn http_client(&self) -> HttpClient {
        HttpClient::new(self.http_timeout)
    }

    pub fn open_cache(&self) -> Result<Option<CacheDir>, CertificateError> {
        match &self.cache_dir {
            Some(dir) => Ok(Some(CacheDir::open(dir)?)),
            None => Ok(None),
        }
    }

    /// Remove every cached key, settings blob and device table.
    pub fn clear_cache(&self) -> Result<usize, CertificateError> {
        match self.open_cache()? {
            Some(cache) => Ok(cache.clear()?),
            None => Ok(0),
        }
    }

    /// Override file, else online sources behind the cache when one is configured.
    pub fn key_resolver(&self, cache: Option<CacheDir>) -> Box<dyn KeyResolver> {
        if let Some(path) = &self.key_override {
            info!(path = %path.display(), "using key override");
            return Box::new(ForcedKeyResolver::new(path));
        }

        let http = self.http_client();
        let dgc: Box<dyn KeySource> = match &self.dgc_source {
            DgcSource::Resume => Box::new(DgcKeySource::resume(http.clone(), self.dgc_base_url.as_str())),
            DgcSource::TrustList { url } => Box::new(DgcKeySource::trust_list(http.clone(), url.as_str())),
        };
        let online = OnlineKeyResolver::new(vec![
            Box::new(NhsKeySource::new(http, self.nhs_base_url.as_str())),
            dgc,
        ]);

        match cache {
            Some(cache) => Box::new(CachedKeyResolver::new(online, cache)),
            None => Box::new(online),
        }
    }
}

/// Parse `YYYY-MM-DD[-HH:MM[:SS]][±HH[:MM]]`. No offset means UTC.
pub fn parse_reference_time(text: &str) -> Result<DateTime<Utc>, CertificateError> {
    let err = || CertificateError::InvalidReferenceTime(text.to_string());
    let trimmed = text.trim();
    if trimmed.len() < 10 || !trimmed.is_ascii() {
        return Err(err());
    }

    let (day, mut rest) = trimmed.split_at(10);
    let day = NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| err())?;

    let mut time = NaiveTime::MIN;
    let b = rest.as_bytes();
    if b.len() >= 6 && b[0] == b'-' && b[3] == b':' {
        let with_seconds = b.len() >= 9 && b[6] == b':';
        let (clock, tail) = rest[1..].split_at(if with_seconds { 8 } else { 5 });
        let fmt = if with_seconds { "%H:%M:%S" } else { "%H:%M" };
        time = NaiveTime::parse_from_str(clock, fmt).map_err(|_| err())?;
        rest = tail;
    }

    let offset = parse_offset(rest)
        .ok()
        .and_then(FixedOffset::east_opt)
        .ok_or_else(err)?;
    day.and_time(time)
        .and_local_timezone(offset)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(err)
}
