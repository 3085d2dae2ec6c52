// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Issuer key resolution, verification settings and their on-disk cache.

pub mod cache;
pub mod devices;
pub mod error;
pub mod http;
pub mod resolver;
pub mod settings;
pub mod sources;

pub use cache::{key_file_name, CacheDir, DEVICE_NAMES_BLOB, SETTINGS_BLOB};
pub use devices::{fetch_device_names, load_device_names, DeviceNames, DEFAULT_DEVICE_EXPORT_URL};
pub use error::TrustError;
pub use http::{join_url, HttpClient, DEFAULT_TIMEOUT};
pub use resolver::{CachedKeyResolver, ForcedKeyResolver, KeyResolver, OnlineKeyResolver};
pub use settings::{
    fetch_settings, load_settings, DayWindow, HourWindow, RecoveryWindows, TestWindows, TrustSettings,
    VaccineWindows,
};
pub use sources::{
    extract_embedded_json, find_nhs_key, find_status_index, find_trust_list_key, DgcKeySource, DgcTransport,
    KeySource, NhsKeySource, DEFAULT_DGCG_BASE_URL, DEFAULT_DGC_BASE_URL, DEFAULT_NHS_BASE_URL,
};
