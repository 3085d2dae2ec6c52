// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Rapid-test device display names from the public device export.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{CacheDir, DEVICE_NAMES_BLOB};
use crate::error::TrustError;
use crate::http::HttpClient;

pub const DEFAULT_DEVICE_EXPORT_URL: &str = "https://covid-19-diagnostics.jrc.ec.europa.eu/devices/export?manufacturer=&text_name=&marking=&rapid_diag=&format=&target_type=&field-1=HSC%20common%20list%20%28RAT%29&value-1=1&search_method=AND";

/// Device id -> commercial name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceNames(pub BTreeMap<String, String>);

#[derive(Debug, Deserialize)]
struct DeviceEntry {
    id_device: serde_json::Value,
    #[serde(default)]
    commercial_name: String,
}

impl DeviceNames {
    pub fn from_json(body: &str) -> Result<Self, TrustError> {
        let entries: Vec<DeviceEntry> =
            serde_json::from_str(body).map_err(|e| TrustError::Parse(format!("device export: {e}")))?;
        let names = entries
            .into_iter()
            .map(|e| {
                let id = match e.id_device {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (id, e.commercial_name)
            })
            .collect();
        Ok(Self(names))
    }

    pub fn get(&self, device_id: &str) -> Option<&str> {
        self.0.get(device_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Fetch the export. Display names are cosmetic, so any failure yields an empty table.
pub fn fetch_device_names(http: &HttpClient, url: &str) -> DeviceNames {
    match http
        .get_text(url, &[("Accept", "application/json")])
        .and_then(|body| DeviceNames::from_json(&body))
    {
        Ok(names) => names,
        Err(e) => {
            warn!(error = %e, "device names unavailable");
            DeviceNames::default()
        }
    }
}

/// Device names from the `tests` cache blob, fetching on a miss.
///
/// An empty table is never persisted so a failed fetch is retried next time.
pub fn load_device_names(http: &HttpClient, url: &str, cache: Option<&CacheDir>) -> DeviceNames {
    let Some(cache) = cache else {
        return fetch_device_names(http, url);
    };

    match cache.read(DEVICE_NAMES_BLOB) {
        Ok(Some(bytes)) => match serde_json::from_slice::<DeviceNames>(&bytes) {
            Ok(names) => {
                debug!("device names cache hit");
                return names;
            }
            Err(e) => warn!(error = %e, "discarding corrupt device name cache"),
        },
        Ok(None) => {}
        Err(e) => warn!(error = %e, "device name cache unreadable"),
    }

    let names = fetch_device_names(http, url);
    if !names.is_empty() {
        let stored = serde_json::to_vec(&names)
            .map_err(|e| e.to_string())
            .and_then(|bytes| cache.write(DEVICE_NAMES_BLOB, &bytes).map_err(|e| e.to_string()));
        if let Err(e) = stored {
            warn!(error = %e, "could not cache device names");
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_may_be_numbers_or_strings() {
        let names = DeviceNames::from_json(
            r#"[{"id_device":1232,"commercial_name":"Panbio"},{"id_device":"1333","commercial_name":"Flowflex"}]"#,
        )
        .unwrap();
        assert_eq!(names.get("1232"), Some("Panbio"));
        assert_eq!(names.get("1333"), Some("Flowflex"));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn unreachable_export_is_empty() {
        let names = fetch_device_names(&HttpClient::default(), "http://127.0.0.1:1/export");
        assert!(names.is_empty());
    }
}
