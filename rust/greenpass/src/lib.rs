// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Verifier for EU digital COVID certificates and NHS passes.
//!
//! A [`Verifier`] turns the text carried by a certificate QR code into a
//! verdict plus the typed [`Certificate`] and [`Diagnostics`] explaining it.
//!
//! ```no_run
//! use greenpass::{Verifier, VerifierConfig};
//!
//! let verifier = Verifier::from_config(&VerifierConfig::default())?;
//! let outcome = verifier.verify("HC1:...");
//! println!("valid: {}", outcome.verdict);
//! # Ok::<(), greenpass::CertificateError>(())
//! ```

pub mod certificate;
pub mod config;
pub mod dates;
pub mod error;
pub mod names;
pub mod rules;
pub mod schema;
pub mod verifier;

pub use certificate::{
    Certificate, CertificateKind, EntryInfo, PersonalInfo, QrInfo, RecoveryEntry, TestEntry, TestResult,
    VaccineEntry,
};
pub use config::{default_cache_dir, default_trust_list_url, parse_reference_time, DgcSource, VerifierConfig};
pub use dates::{parse_date, CertificateDate};
pub use error::CertificateError;
pub use names::{disease_name, manufacturer_name, vaccine_name, TestType};
pub use rules::{Assessment, RuleEngine, Validity, Window};
pub use schema::{key_id, map_message, map_payload};
pub use verifier::{device_names, inspect, BatchOutcome, Diagnostics, Stage, VerificationOutcome, Verifier};

pub use greenpass_trust::{KeyResolver, TrustSettings};
