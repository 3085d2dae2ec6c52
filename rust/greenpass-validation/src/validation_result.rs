// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Validation result types.
//!
//! Signature checks report a structured result rather than an error so the
//! orchestrator can always produce a verdict and explain a rejection.

use std::collections::HashMap;

/// Stable failure codes reported in [`ValidationFailure::error_code`].
pub mod codes {
    pub const UNSUPPORTED_ALG: &str = "UNSUPPORTED_ALG";
    pub const SIGSTRUCT_ERROR: &str = "SIGSTRUCT_ERROR";
    pub const INVALID_PUBLIC_KEY: &str = "INVALID_PUBLIC_KEY";
    pub const BAD_SIGNATURE: &str = "BAD_SIGNATURE";
    /// No `kid` in either header bucket.
    pub const KEY_ID_NOT_FOUND: &str = "KEY_ID_NOT_FOUND";
    /// No trust source could supply the issuer key.
    pub const KEY_RESOLUTION_FAILED: &str = "KEY_RESOLUTION_FAILED";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    /// Human-readable explanation of the failure.
    pub message: String,
    /// Optional machine-readable error code.
    pub error_code: Option<String>,
}

/// Outcome of one signature check. `metadata` carries `alg` on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub validator_name: String,
    pub failures: Vec<ValidationFailure>,
    pub metadata: HashMap<String, String>,
}

impl ValidationResult {
    pub fn success(validator_name: impl Into<String>, metadata: HashMap<String, String>) -> Self {
        Self {
            is_valid: true,
            validator_name: validator_name.into(),
            failures: Vec::new(),
            metadata,
        }
    }

    pub fn failure(validator_name: impl Into<String>, failures: Vec<ValidationFailure>) -> Self {
        Self {
            is_valid: false,
            validator_name: validator_name.into(),
            failures,
            metadata: HashMap::new(),
        }
    }

    /// Construct a failure result from a single message and error code.
    pub fn failure_message(
        validator_name: impl Into<String>,
        message: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self::failure(
            validator_name,
            vec![ValidationFailure {
                message: message.into(),
                error_code: Some(error_code.into()),
            }],
        )
    }

    pub fn first_error_code(&self) -> Option<&str> {
        self.failures.iter().find_map(|f| f.error_code.as_deref())
    }

    /// Failure messages prefixed with their code, for logs and diagnostics.
    pub fn failure_lines(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| match &f.error_code {
                Some(code) => format!("{code}: {}", f.message),
                None => f.message.clone(),
            })
            .collect()
    }
}
