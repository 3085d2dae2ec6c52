// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod algorithms;
pub mod cose_sign1_verifier;
pub mod trust_key;
pub mod validation_result;

pub use algorithms::{algorithm_name, CoseAlgorithm};
pub use cose_sign1_verifier::{verify_cose_message, verify_sig_structure};
pub use trust_key::{extract_ec_point, Curve, KeyError, TrustKey, UNCOMPRESSED_POINT_LEN};
pub use validation_result::{codes, ValidationFailure, ValidationResult};
