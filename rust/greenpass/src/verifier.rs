// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Verification pipeline.
//!
//! decode -> map -> rules -> key resolution -> signature -> verdict.
//! A failure before the signature check ends the pipeline with a negative
//! verdict; key resolution and signature failures only clear `verified`.
//! Nothing here returns an error to the caller.

use std::collections::BTreeSet;

use greenpass_common::{decode, decode_payload, CborValue, CoseHeaderMap, CoseMessage};
use greenpass_trust::{load_device_names, load_settings, DeviceNames, KeyResolver};
use greenpass_validation::{codes, verify_cose_message, ValidationResult};
use tracing::{debug, info, warn};

use crate::certificate::{Certificate, CertificateKind};
use crate::config::VerifierConfig;
use crate::error::CertificateError;
use crate::rules::RuleEngine;
use crate::schema::{key_id, map_message};

pub const SIGNATURE_VALIDATOR_NAME: &str = "ES256 Signature";

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    #[default]
    Start,
    Decoded,
    Mapped,
    RulesEvaluated,
    KeyResolved,
    SignatureChecked,
    Verdicted,
}

/// Everything observed on the way to a verdict.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Last stage completed before the verdict.
    pub stage: Stage,
    pub non_base45_chars: BTreeSet<char>,
    pub protected_headers: serde_json::Value,
    pub unprotected_headers: serde_json::Value,
    pub signature: Vec<u8>,
    /// The CWT payload rendered as JSON.
    pub payload: Option<serde_json::Value>,
    pub signature_check: Option<ValidationResult>,
    pub failures: Vec<String>,
}

impl Diagnostics {
    fn fail(&mut self, error: &CertificateError) {
        warn!(stage = ?self.stage, error = %error, "verification stopped");
        self.failures.push(error.to_string());
    }

    fn record_message(&mut self, message: &CoseMessage) {
        self.protected_headers = headers_json(&message.protected_headers);
        self.unprotected_headers = headers_json(&message.unprotected_headers);
        self.signature = message.signature.clone();
    }
}

fn headers_json(headers: &CoseHeaderMap) -> serde_json::Value {
    CborValue::Map(headers.map().clone()).to_json()
}

#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub verdict: bool,
    /// Default (kind `Unknown`) when the payload could not be decoded or mapped.
    pub certificate: Certificate,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// True only when there was at least one payload and every one verified.
    pub verdict: bool,
    pub outcomes: Vec<VerificationOutcome>,
}

/// Decode `text` without verifying anything: headers, signature and payload JSON.
pub fn inspect(text: &str) -> Result<Diagnostics, CertificateError> {
    let mut diagnostics = Diagnostics::default();
    decode_stage(text, &mut diagnostics)?;
    Ok(diagnostics)
}

fn decode_stage(text: &str, diagnostics: &mut Diagnostics) -> Result<(CoseMessage, CborValue), CertificateError> {
    let decoded = decode(text)?;
    diagnostics.non_base45_chars = decoded.non_base45_chars;
    diagnostics.record_message(&decoded.message);

    let payload = decode_payload(&decoded.message)?;
    diagnostics.payload = Some(payload.to_json());
    diagnostics.stage = Stage::Decoded;
    Ok((decoded.message, payload))
}

pub struct Verifier {
    rules: RuleEngine,
    resolver: Box<dyn KeyResolver>,
}

impl Verifier {
    pub fn new(rules: RuleEngine, resolver: Box<dyn KeyResolver>) -> Self {
        Self { rules, resolver }
    }

    /// Load settings (fatal on failure) and build the key resolver.
    pub fn from_config(config: &VerifierConfig) -> Result<Self, CertificateError> {
        let http = config.http_client();
        let cache = config.open_cache()?;
        let settings = load_settings(&http, &config.dgc_base_url, cache.as_ref())?;

        let mut rules = RuleEngine::new(settings)
            .with_blocklist(config.enforce_blocklist)
            .with_recovery_expiration(config.consider_recovery_expiration);
        if let Some(at) = config.reference_time {
            rules = rules.with_reference_time(at);
        }
        Ok(Self::new(rules, config.key_resolver(cache)))
    }

    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    pub fn verify(&self, text: &str) -> VerificationOutcome {
        let mut diagnostics = Diagnostics::default();

        let (message, payload) = match decode_stage(text, &mut diagnostics) {
            Ok(v) => v,
            Err(e) => return rejected(Certificate::default(), diagnostics, &e),
        };

        let certificate = match map_message(&message, &payload) {
            Ok(c) => c,
            Err(e) => return rejected(Certificate::default(), diagnostics, &e),
        };
        diagnostics.stage = Stage::Mapped;

        let assessment = self.rules.evaluate(&certificate);
        certificate.record_assessment(assessment.clone());
        diagnostics.stage = Stage::RulesEvaluated;

        let verified = self.check_signature(&message, &mut diagnostics);
        certificate.record_verified(verified);

        let known = !matches!(certificate.kind, CertificateKind::Unknown);
        let verdict = verified
            && !assessment.expired
            && !certificate.is_test_positive()
            && known
            && !assessment.blocklisted;

        info!(
            kind = certificate.kind.name(),
            verified,
            expired = assessment.expired,
            blocklisted = assessment.blocklisted,
            verdict,
            "certificate verified"
        );
        diagnostics.stage = Stage::Verdicted;
        VerificationOutcome {
            verdict,
            certificate,
            diagnostics,
        }
    }

    fn check_signature(&self, message: &CoseMessage, diagnostics: &mut Diagnostics) -> bool {
        let kid = match key_id(message) {
            Ok(kid) => kid,
            Err(e) => {
                diagnostics.fail(&e);
                diagnostics.signature_check = Some(ValidationResult::failure_message(
                    SIGNATURE_VALIDATOR_NAME,
                    e.to_string(),
                    codes::KEY_ID_NOT_FOUND,
                ));
                return false;
            }
        };

        let key = match self.resolver.resolve_key(kid) {
            Ok(key) => key,
            Err(e) => {
                let e = CertificateError::from(e);
                diagnostics.fail(&e);
                diagnostics.signature_check = Some(ValidationResult::failure_message(
                    SIGNATURE_VALIDATOR_NAME,
                    e.to_string(),
                    codes::KEY_RESOLUTION_FAILED,
                ));
                return false;
            }
        };
        diagnostics.stage = Stage::KeyResolved;

        let result = verify_cose_message(SIGNATURE_VALIDATOR_NAME, message, &key);
        if !result.is_valid {
            debug!(code = ?result.first_error_code(), "signature rejected");
            diagnostics.failures.extend(result.failure_lines());
        }
        let verified = result.is_valid;
        diagnostics.signature_check = Some(result);
        diagnostics.stage = Stage::SignatureChecked;
        verified
    }

    /// Verify each payload independently. An empty batch is not valid.
    pub fn verify_batch<S: AsRef<str>>(&self, texts: &[S]) -> BatchOutcome {
        let outcomes: Vec<VerificationOutcome> = texts.iter().map(|t| self.verify(t.as_ref())).collect();
        BatchOutcome {
            verdict: !outcomes.is_empty() && outcomes.iter().all(|o| o.verdict),
            outcomes,
        }
    }
}

fn rejected(certificate: Certificate, mut diagnostics: Diagnostics, error: &CertificateError) -> VerificationOutcome {
    diagnostics.fail(error);
    VerificationOutcome {
        verdict: false,
        certificate,
        diagnostics,
    }
}

/// Display names for rapid-test devices, cached next to the settings when a cache is configured.
pub fn device_names(config: &VerifierConfig) -> DeviceNames {
    let cache = config.open_cache().ok().flatten();
    load_device_names(&config.http_client(), &config.device_export_url, cache.as_ref())
}
