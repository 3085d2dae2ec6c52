// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! COSE_Sign1 signature verification against a resolved issuer key.
//!
//! 1) Resolve `alg` (protected headers first, then unprotected; absent means ES256).
//! 2) Build the Sig_structure bytes.
//! 3) Verify the raw `r || s` signature with the issuer's P-256 key.

use std::collections::HashMap;

use greenpass_common::{encode_signature1_sig_structure, CoseMessage};
use signature::Verifier;
use tracing::debug;

use crate::algorithms::{algorithm_name, CoseAlgorithm};
use crate::trust_key::TrustKey;
use crate::validation_result::{codes, ValidationResult};

pub fn verify_cose_message(validator_name: &str, message: &CoseMessage, key: &TrustKey) -> ValidationResult {
    let alg = match CoseAlgorithm::from_header(message.algorithm()) {
        Ok(a) => a,
        Err(v) => {
            return ValidationResult::failure_message(
                validator_name,
                format!("unsupported alg: {v} ({})", algorithm_name(v)),
                codes::UNSUPPORTED_ALG,
            )
        }
    };

    let sig_structure = match encode_signature1_sig_structure(message) {
        Ok(b) => b,
        Err(e) => return ValidationResult::failure_message(validator_name, e, codes::SIGSTRUCT_ERROR),
    };

    match verify_sig_structure(alg, key, &sig_structure, &message.signature) {
        Ok(()) => {
            let mut metadata = HashMap::new();
            metadata.insert("alg".to_string(), alg.name().to_string());
            ValidationResult::success(validator_name, metadata)
        }
        Err((code, msg)) => {
            debug!(code, error = %msg, "signature rejected");
            ValidationResult::failure_message(validator_name, msg, code)
        }
    }
}

pub fn verify_sig_structure(
    alg: CoseAlgorithm,
    key: &TrustKey,
    sig_structure: &[u8],
    cose_signature: &[u8],
) -> Result<(), (&'static str, String)> {
    match alg {
        CoseAlgorithm::ES256 => verify_ecdsa_p256(key, sig_structure, cose_signature),
    }
}

fn verify_ecdsa_p256(key: &TrustKey, msg: &[u8], sig: &[u8]) -> Result<(), (&'static str, String)> {
    let vk = key
        .verifying_key()
        .map_err(|e| (codes::INVALID_PUBLIC_KEY, e.to_string()))?;

    // COSE carries ECDSA signatures as the raw `r || s` concatenation.
    let signature = p256::ecdsa::Signature::from_slice(sig)
        .map_err(|e| (codes::BAD_SIGNATURE, format!("bad ES256 signature: {e}")))?;
    vk.verify(msg, &signature)
        .map_err(|_| (codes::BAD_SIGNATURE, "signature verification failed".to_string()))
}
