// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Online issuer key sources.
//!
//! - NHS publishes a JSON list of `{kid, publicKey}` with base64 SPKI keys.
//! - DGC publishes signer certificates either through a resume-token protocol
//!   (`signercertificate/status` + `signercertificate/update`) or through a
//!   trust-list document keyed by country.

use std::collections::BTreeMap;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::Deserialize;
use tracing::debug;

use crate::error::TrustError;
use crate::http::{join_url, HttpClient};

pub const DEFAULT_NHS_BASE_URL: &str = "https://covid-status.service.nhsx.nhs.uk/";
pub const DEFAULT_DGC_BASE_URL: &str = "https://get.dgc.gov.it/v1/dgc/";
pub const DEFAULT_DGCG_BASE_URL: &str = "https://dgcg.covidbevis.se/tp/";

const RESUME_TOKEN_HEADER: &str = "x-resume-token";

/// A place issuer keys can be looked up by key id.
pub trait KeySource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw key material for `key_id`, or `Ok(None)` when this source does not know it.
    fn find_key(&self, key_id: &[u8]) -> Result<Option<Vec<u8>>, TrustError>;
}

const KID_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);
const KID_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Compare a listed base64 kid to `key_id` as bytes. Either alphabet, padded
/// or not, with any whitespace. Undecodable entries never match.
fn kid_matches(listed: &str, key_id: &[u8]) -> bool {
    let compact: String = listed.chars().filter(|c| !c.is_whitespace()).collect();
    match KID_STANDARD.decode(&compact).or_else(|_| KID_URL_SAFE.decode(&compact)) {
        Ok(bytes) => bytes == key_id,
        Err(e) => {
            debug!(kid = listed, error = %e, "skipping undecodable kid");
            false
        }
    }
}

fn decode_b64(text: &str) -> Result<Vec<u8>, TrustError> {
    base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|e| TrustError::Parse(format!("bad base64: {e}")))
}

#[derive(Debug, Deserialize)]
struct NhsKeyEntry {
    kid: String,
    #[serde(rename = "publicKey")]
    public_key: String,
}

/// Look up `key_id` in an NHS key list document.
pub fn find_nhs_key(body: &str, key_id: &[u8]) -> Result<Option<Vec<u8>>, TrustError> {
    let entries: Vec<NhsKeyEntry> =
        serde_json::from_str(body).map_err(|e| TrustError::Parse(format!("nhs key list: {e}")))?;
    match entries.iter().find(|e| kid_matches(&e.kid, key_id)) {
        Some(entry) => decode_b64(&entry.public_key).map(Some),
        None => Ok(None),
    }
}

#[derive(Debug, Clone)]
pub struct NhsKeySource {
    http: HttpClient,
    base_url: String,
}

impl NhsKeySource {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

impl KeySource for NhsKeySource {
    fn name(&self) -> &'static str {
        "nhs"
    }

    fn find_key(&self, key_id: &[u8]) -> Result<Option<Vec<u8>>, TrustError> {
        let url = join_url(&self.base_url, "pubkeys/keys.json")?;
        let body = self.http.get_text(&url, &[("Accept", "application/json")])?;
        find_nhs_key(&body, key_id)
    }
}

/// Position of `key_id` in a DGC `signercertificate/status` document.
pub fn find_status_index(body: &str, key_id: &[u8]) -> Result<Option<usize>, TrustError> {
    let kids: Vec<String> =
        serde_json::from_str(body).map_err(|e| TrustError::Parse(format!("dgc status: {e}")))?;
    Ok(kids.iter().position(|k| kid_matches(k, key_id)))
}

#[derive(Debug, Deserialize)]
struct TrustList {
    dsc_trust_list: BTreeMap<String, CountryKeys>,
}

#[derive(Debug, Deserialize)]
struct CountryKeys {
    #[serde(default)]
    keys: Vec<TrustListKey>,
}

#[derive(Debug, Deserialize)]
struct TrustListKey {
    kid: String,
    #[serde(default)]
    x5c: Vec<String>,
}

/// Pull the JSON document out of a trust-list page.
///
/// The page may be bare JSON, a compact JWS whose payload is the JSON, or
/// markup with the document embedded as its outermost `{...}` span.
pub fn extract_embedded_json(body: &str) -> Result<serde_json::Value, TrustError> {
    let trimmed = body.trim();
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return Ok(v);
    }

    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() == 3 {
        let payload = parts[1].trim_end_matches('=');
        if let Ok(bytes) = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload) {
            if let Ok(v) = serde_json::from_slice::<serde_json::Value>(&bytes) {
                return Ok(v);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return serde_json::from_str(&trimmed[start..=end])
                .map_err(|e| TrustError::Parse(format!("trust list: {e}")));
        }
    }

    Err(TrustError::Parse("trust list: no JSON document found".to_string()))
}

/// Look up `key_id` in a trust-list document, returning the leaf certificate DER.
pub fn find_trust_list_key(doc: serde_json::Value, key_id: &[u8]) -> Result<Option<Vec<u8>>, TrustError> {
    let list: TrustList =
        serde_json::from_value(doc).map_err(|e| TrustError::Parse(format!("trust list: {e}")))?;
    for (country, keys) in &list.dsc_trust_list {
        for key in &keys.keys {
            if !kid_matches(&key.kid, key_id) {
                continue;
            }
            let Some(leaf) = key.x5c.first() else {
                return Err(TrustError::Parse(format!("trust list entry for {country} has no x5c")));
            };
            debug!(country = %country, "key found in trust list");
            return decode_b64(leaf).map(Some);
        }
    }
    Ok(None)
}

#[derive(Debug, Clone)]
pub enum DgcTransport {
    /// `signercertificate/status` + `signercertificate/update` relative to this base.
    Resume { base_url: String },
    /// A single trust-list page.
    TrustList { url: String },
}

#[derive(Debug, Clone)]
pub struct DgcKeySource {
    http: HttpClient,
    transport: DgcTransport,
}

impl DgcKeySource {
    pub fn new(http: HttpClient, transport: DgcTransport) -> Self {
        Self { http, transport }
    }

    pub fn resume(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self::new(
            http,
            DgcTransport::Resume {
                base_url: base_url.into(),
            },
        )
    }

    pub fn trust_list(http: HttpClient, url: impl Into<String>) -> Self {
        Self::new(http, DgcTransport::TrustList { url: url.into() })
    }

    fn find_via_resume(&self, base_url: &str, key_id: &[u8]) -> Result<Option<Vec<u8>>, TrustError> {
        let status_url = join_url(base_url, "signercertificate/status")?;
        let status = self.http.get_text(&status_url, &[("Accept", "application/json")])?;
        let Some(index) = find_status_index(&status, key_id)? else {
            return Ok(None);
        };

        let update_url = join_url(base_url, "signercertificate/update")?;
        let token = index.to_string();
        let body = self
            .http
            .get_text(&update_url, &[(RESUME_TOKEN_HEADER, token.as_str())])?;
        decode_b64(&body).map(Some)
    }

    fn find_via_trust_list(&self, url: &str, key_id: &[u8]) -> Result<Option<Vec<u8>>, TrustError> {
        let body = self.http.get_text(url, &[])?;
        let doc = extract_embedded_json(&body)?;
        find_trust_list_key(doc, key_id)
    }
}

impl KeySource for DgcKeySource {
    fn name(&self) -> &'static str {
        "dgc"
    }

    fn find_key(&self, key_id: &[u8]) -> Result<Option<Vec<u8>>, TrustError> {
        match &self.transport {
            DgcTransport::Resume { base_url } => self.find_via_resume(base_url, key_id),
            DgcTransport::TrustList { url } => self.find_via_trust_list(url, key_id),
        }
    }
}
