// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Display names for the value-set codes carried in certificates.

use std::collections::HashMap;
use std::fmt;

use greenpass_trust::DeviceNames;
use once_cell::sync::Lazy;

static VACCINE_PRODUCTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("EU/1/20/1507", "Moderna"),
        ("EU/1/20/1525", "Janssen"),
        ("EU/1/20/1528", "Pfizer"),
        ("EU/1/21/1529", "AstraZeneca"),
        ("EU/1/XX/XXX1", "Sputnik-V"),
        ("EU/1/XX/XXX2", "CVnCoV"),
        ("EU/1/XX/XXX3", "EpiVacCorona"),
        ("EU/1/XX/XXX4", "BBIBP-CorV"),
        ("EU/1/XX/XXX5", "CoronaVac"),
    ])
});

static MANUFACTURERS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ORG-100001699", "AstraZeneca"),
        ("ORG-100030215", "Biontech"),
        ("ORG-100001417", "Janssen"),
        ("ORG-100031184", "Moderna"),
        ("ORG-100006270", "Curevac"),
        ("ORG-100013793", "CanSino"),
        ("ORG-100020693", "Sinopharm"),
        ("ORG-100010771", "Sinopharm"),
        ("ORG-100024420", "Sinopharm"),
        ("ORG-100032020", "Novavax"),
    ])
});

static DISEASES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("840539006", "Covid19")]));

pub const MOLECULAR_TEST_CODE: &str = "LP6464-4";
pub const RAPID_TEST_CODE: &str = "LP217198-3";

/// Unknown codes are shown as-is.
pub fn vaccine_name(code: &str) -> &str {
    VACCINE_PRODUCTS.get(code).copied().unwrap_or(code)
}

pub fn disease_name(code: &str) -> &str {
    DISEASES.get(code).copied().unwrap_or(code)
}

/// Vaccine manufacturers first, then rapid-test devices.
pub fn manufacturer_name<'a>(code: &'a str, devices: &'a DeviceNames) -> &'a str {
    MANUFACTURERS
        .get(code)
        .copied()
        .or_else(|| devices.get(code))
        .unwrap_or(code)
}

/// Test category, which selects the validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestType {
    Molecular,
    Rapid,
    Other(String),
}

impl TestType {
    pub fn from_code(code: &str) -> Self {
        match code {
            MOLECULAR_TEST_CODE => TestType::Molecular,
            RAPID_TEST_CODE => TestType::Rapid,
            other => TestType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestType::Molecular => f.write_str("molecular"),
            TestType::Rapid => f.write_str("rapid"),
            TestType::Other(code) => f.write_str(code),
        }
    }
}
