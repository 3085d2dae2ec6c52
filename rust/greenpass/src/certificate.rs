// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Typed certificate model.
//!
//! The schema mapper builds a [`Certificate`]; the rule engine and the
//! verifier each record their result on it exactly once.

use std::fmt;

use once_cell::sync::OnceCell;

use crate::dates::CertificateDate;
use crate::names::TestType;
use crate::rules::Assessment;

pub const TEST_RESULT_POSITIVE: &str = "260373001";
pub const TEST_RESULT_NEGATIVE: &str = "260415000";

/// CWT claims outside the health certificate itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QrInfo {
    pub issuing_country: String,
    pub release_date: CertificateDate,
    pub expiration_date: CertificateDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonalInfo {
    pub schema_version: String,
    pub date_of_birth: String,
    pub first_name: String,
    pub last_name: String,
}

/// Fields shared by every entry kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryInfo {
    pub target_disease: String,
    pub country: String,
    pub issuer: String,
    pub certificate_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaccineEntry {
    pub info: EntryInfo,
    pub vaccine_type: String,
    pub vaccination_date: CertificateDate,
    pub product: Option<String>,
    pub manufacturer: Option<String>,
    pub dose_number: i64,
    pub total_doses: i64,
}

impl VaccineEntry {
    pub fn full_course(&self) -> bool {
        self.dose_number >= self.total_doses
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestResult {
    Positive,
    Negative,
    /// Any other code, kept verbatim.
    Unknown(String),
}

impl TestResult {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            TEST_RESULT_POSITIVE => TestResult::Positive,
            TEST_RESULT_NEGATIVE => TestResult::Negative,
            other => TestResult::Unknown(other.to_string()),
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, TestResult::Positive)
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestResult::Positive => f.write_str("Positive"),
            TestResult::Negative => f.write_str("Negative"),
            TestResult::Unknown(_) => f.write_str("Unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEntry {
    pub info: EntryInfo,
    pub test_type: TestType,
    pub collection_date: CertificateDate,
    pub result: Option<TestResult>,
    pub test_name: Option<String>,
    pub manufacturer: Option<String>,
    pub testing_center: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryEntry {
    pub info: EntryInfo,
    pub valid_from: CertificateDate,
    pub valid_until: CertificateDate,
    pub first_positive_test: Option<String>,
}

/// Decided once, at mapping time, from which fields the entry carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CertificateKind {
    Vaccine(VaccineEntry),
    Test(TestEntry),
    Recovery(RecoveryEntry),
    #[default]
    Unknown,
}

impl CertificateKind {
    pub fn name(&self) -> &'static str {
        match self {
            CertificateKind::Vaccine(_) => "Vaccine",
            CertificateKind::Test(_) => "Test",
            CertificateKind::Recovery(_) => "Recovery",
            CertificateKind::Unknown => "Unknown",
        }
    }

    pub fn info(&self) -> Option<&EntryInfo> {
        match self {
            CertificateKind::Vaccine(v) => Some(&v.info),
            CertificateKind::Test(t) => Some(&t.info),
            CertificateKind::Recovery(r) => Some(&r.info),
            CertificateKind::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Certificate {
    pub qr_info: QrInfo,
    pub personal_info: PersonalInfo,
    pub kind: CertificateKind,
    pub key_id: Option<Vec<u8>>,
    pub signature_algorithm: Option<i64>,
    assessment: OnceCell<Assessment>,
    verified: OnceCell<bool>,
}

impl Certificate {
    pub fn new(qr_info: QrInfo, personal_info: PersonalInfo, kind: CertificateKind) -> Self {
        Self {
            qr_info,
            personal_info,
            kind,
            ..Default::default()
        }
    }

    pub fn certificate_id(&self) -> Option<&str> {
        self.kind.info().map(|i| i.certificate_id.as_str())
    }

    pub fn is_test_positive(&self) -> bool {
        match &self.kind {
            CertificateKind::Test(t) => t.result.as_ref().is_some_and(TestResult::is_positive),
            _ => false,
        }
    }

    pub fn assessment(&self) -> Option<&Assessment> {
        self.assessment.get()
    }

    pub fn expired(&self) -> bool {
        self.assessment().is_some_and(|a| a.expired)
    }

    pub fn blocklisted(&self) -> bool {
        self.assessment().is_some_and(|a| a.blocklisted)
    }

    pub fn hours_to_valid(&self) -> Option<f64> {
        self.assessment().and_then(|a| a.window).map(|w| w.since)
    }

    pub fn remaining_hours(&self) -> Option<f64> {
        self.assessment().and_then(|a| a.window).map(|w| w.until)
    }

    /// `None` until the signature step ran.
    pub fn verified(&self) -> Option<bool> {
        self.verified.get().copied()
    }

    /// Returns `false` when an assessment was already recorded.
    pub(crate) fn record_assessment(&self, assessment: Assessment) -> bool {
        self.assessment.set(assessment).is_ok()
    }

    pub(crate) fn record_verified(&self, verified: bool) -> bool {
        self.verified.set(verified).is_ok()
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.qr_info == other.qr_info
            && self.personal_info == other.personal_info
            && self.kind == other.kind
            && self.key_id == other.key_id
            && self.signature_algorithm == other.signature_algorithm
            && self.assessment.get() == other.assessment.get()
            && self.verified.get() == other.verified.get()
    }
}
