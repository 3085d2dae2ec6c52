// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Validity windows and blocklist published by the settings endpoint.
//!
//! The endpoint returns a flat list of `{name, type, value}` entries. Entry
//! names encode which window they belong to (`vaccine_end_day_complete`,
//! `rapid_test_start_hours`, `recovery_cert_end_day_IT`, ...), while `type`
//! carries the vaccine product code for vaccine entries.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheDir, SETTINGS_BLOB};
use crate::error::TrustError;
use crate::http::{join_url, HttpClient};

static VACCINE_VARIANT: Lazy<Regex> =
    Lazy::new(|| Regex::new("((?:(?:not_)?complete|booster)(?:_(?:NOT_)?IT)?)").unwrap());
static DAY_BOUND: Lazy<Regex> = Lazy::new(|| Regex::new("(start|end)_day").unwrap());
static HOUR_BOUND: Lazy<Regex> = Lazy::new(|| Regex::new("(start|end)_hours").unwrap());

const BLOCKLIST_NAME: &str = "black_list_uvci";

/// A window expressed in days from the reference date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start_day: Option<i64>,
    pub end_day: Option<i64>,
}

impl DayWindow {
    pub fn new(start_day: i64, end_day: i64) -> Self {
        Self {
            start_day: Some(start_day),
            end_day: Some(end_day),
        }
    }

    /// Both bounds, when the settings defined them.
    pub fn bounds(&self) -> Option<(i64, i64)> {
        Some((self.start_day?, self.end_day?))
    }

    fn set(&mut self, bound: &str, value: i64) {
        match bound {
            "start" => self.start_day = Some(value),
            _ => self.end_day = Some(value),
        }
    }
}

/// A window expressed in hours from the sample collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourWindow {
    pub start_hours: Option<i64>,
    pub end_hours: Option<i64>,
}

impl HourWindow {
    pub fn new(start_hours: i64, end_hours: i64) -> Self {
        Self {
            start_hours: Some(start_hours),
            end_hours: Some(end_hours),
        }
    }

    pub fn bounds(&self) -> Option<(i64, i64)> {
        Some((self.start_hours?, self.end_hours?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccineWindows {
    pub complete: DayWindow,
    pub not_complete: DayWindow,
    pub booster: DayWindow,
    pub complete_it: DayWindow,
    pub complete_not_it: DayWindow,
    pub booster_it: DayWindow,
    pub booster_not_it: DayWindow,
}

impl VaccineWindows {
    fn variant_mut(&mut self, variant: &str) -> Option<&mut DayWindow> {
        Some(match variant {
            "complete" => &mut self.complete,
            "not_complete" => &mut self.not_complete,
            "booster" => &mut self.booster,
            "complete_IT" => &mut self.complete_it,
            "complete_NOT_IT" => &mut self.complete_not_it,
            "booster_IT" => &mut self.booster_it,
            "booster_NOT_IT" => &mut self.booster_not_it,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryWindows {
    pub default: DayWindow,
    pub pv: DayWindow,
    pub it: DayWindow,
    pub not_it: DayWindow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestWindows {
    pub molecular: HourWindow,
    pub rapid: HourWindow,
}

/// Everything the rule engine needs. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSettings {
    /// Keyed by vaccine product code (`EU/1/20/1528`, ...).
    pub vaccines: BTreeMap<String, VaccineWindows>,
    pub recovery: RecoveryWindows,
    pub tests: TestWindows,
    pub blocklist: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
struct SettingEntry {
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    value: serde_json::Value,
}

impl TrustSettings {
    pub fn from_json(body: &str) -> Result<Self, TrustError> {
        let entries: Vec<SettingEntry> =
            serde_json::from_str(body).map_err(|e| TrustError::Parse(format!("settings: {e}")))?;

        let mut settings = TrustSettings::default();
        for entry in &entries {
            settings.apply(entry);
        }
        debug!(
            vaccines = settings.vaccines.len(),
            blocklisted = settings.blocklist.len(),
            "settings parsed"
        );
        Ok(settings)
    }

    pub fn vaccine(&self, product: &str) -> Option<&VaccineWindows> {
        self.vaccines.get(product)
    }

    pub fn is_blocklisted(&self, certificate_id: &str) -> bool {
        self.blocklist.contains(certificate_id)
    }

    fn apply(&mut self, entry: &SettingEntry) {
        let name = entry.name.as_str();
        if name.contains("vaccine") {
            self.apply_vaccine(entry);
        } else if name.contains("recovery") {
            self.apply_recovery(entry);
        } else if name.contains("test") {
            self.apply_test(entry);
        } else if name == "ios" || name == "android" {
            // App version pins, irrelevant here.
        } else if name == BLOCKLIST_NAME {
            let list = entry.value.as_str().unwrap_or_default();
            self.blocklist
                .extend(list.split(';').map(str::trim).filter(|s| !s.is_empty()).map(String::from));
        } else {
            info!(name, "ignoring unknown setting");
        }
    }

    fn apply_vaccine(&mut self, entry: &SettingEntry) {
        let (Some(variant), Some(bound)) = (
            VACCINE_VARIANT.captures(&entry.name).map(|c| c[1].to_string()),
            DAY_BOUND.captures(&entry.name).map(|c| c[1].to_string()),
        ) else {
            info!(name = %entry.name, "ignoring unknown vaccine setting");
            return;
        };
        let Some(value) = setting_value(entry) else {
            return;
        };

        let windows = self.vaccines.entry(entry.kind.clone()).or_default();
        match windows.variant_mut(&variant) {
            Some(window) => window.set(&bound, value),
            None => info!(name = %entry.name, "ignoring unknown vaccine variant"),
        }
    }

    fn apply_recovery(&mut self, entry: &SettingEntry) {
        let Some(bound) = DAY_BOUND.captures(&entry.name).map(|c| c[1].to_string()) else {
            info!(name = %entry.name, "ignoring unknown recovery setting");
            return;
        };
        let Some(value) = setting_value(entry) else {
            return;
        };

        let name = entry.name.as_str();
        let window = if name.contains("recovery_pv_") {
            &mut self.recovery.pv
        } else if name.contains("NOT_IT") {
            &mut self.recovery.not_it
        } else if name.contains("_IT") {
            &mut self.recovery.it
        } else {
            &mut self.recovery.default
        };
        window.set(&bound, value);
    }

    fn apply_test(&mut self, entry: &SettingEntry) {
        let name = entry.name.as_str();
        let window = if name.contains("molecular") {
            &mut self.tests.molecular
        } else if name.contains("rapid") {
            &mut self.tests.rapid
        } else {
            info!(name, "ignoring unknown test setting");
            return;
        };
        let Some(bound) = HOUR_BOUND.captures(name).map(|c| c[1].to_string()) else {
            info!(name, "ignoring unknown test setting");
            return;
        };
        let Some(value) = setting_value(entry) else {
            return;
        };
        match bound.as_str() {
            "start" => window.start_hours = Some(value),
            _ => window.end_hours = Some(value),
        }
    }
}

fn setting_value(entry: &SettingEntry) -> Option<i64> {
    let parsed = match &entry.value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        warn!(name = %entry.name, value = %entry.value, "non-numeric setting value");
    }
    parsed
}

/// GET the settings list at `<base_url>settings`.
pub fn fetch_settings(http: &HttpClient, base_url: &str) -> Result<TrustSettings, TrustError> {
    let url = join_url(base_url, "settings")?;
    let body = http.get_text(&url, &[("Accept", "application/json")])?;
    TrustSettings::from_json(&body)
}

/// Settings from the cache blob when present, otherwise fetched and persisted.
pub fn load_settings(
    http: &HttpClient,
    base_url: &str,
    cache: Option<&CacheDir>,
) -> Result<TrustSettings, TrustError> {
    match cache {
        Some(cache) => cache.load_or_fetch_json(SETTINGS_BLOB, || fetch_settings(http, base_url)),
        None => fetch_settings(http, base_url),
    }
}
