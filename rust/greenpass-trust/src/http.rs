// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::TrustError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking GET client shared by every trust source.
#[derive(Debug, Clone)]
pub struct HttpClient {
    timeout: Duration,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and return the body. Any status other than 200 is an error.
    pub fn get_text(&self, url: &str, headers: &[(&str, &str)]) -> Result<String, TrustError> {
        debug!(url, "GET");
        let mut req = ureq::get(url).timeout(self.timeout);
        for (name, value) in headers {
            req = req.set(name, value);
        }

        match req.call() {
            Ok(r) => {
                if r.status() != 200 {
                    return Err(TrustError::api(url, format!("http_status_{}", r.status())));
                }
                r.into_string().map_err(|e| TrustError::api(url, e.to_string()))
            }
            Err(ureq::Error::Status(code, r)) => {
                let body = r.into_string().unwrap_or_default();
                Err(TrustError::api(url, format!("http_status_{code}: {body}")))
            }
            Err(e) => Err(TrustError::api(url, e.to_string())),
        }
    }

    pub fn get_json(&self, url: &str) -> Result<serde_json::Value, TrustError> {
        let body = self.get_text(url, &[("Accept", "application/json")])?;
        serde_json::from_str(&body).map_err(|e| TrustError::Parse(format!("{url}: {e}")))
    }
}

/// Resolve `path` against `base`, keeping the base path when it ends in `/`.
pub fn join_url(base: &str, path: &str) -> Result<String, TrustError> {
    let base_url = Url::parse(base).map_err(|e| TrustError::api(base, e.to_string()))?;
    let joined = base_url
        .join(path)
        .map_err(|e| TrustError::api(base, e.to_string()))?;
    Ok(joined.to_string())
}
