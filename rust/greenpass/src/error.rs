// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use greenpass_common::CodecError;
use greenpass_trust::TrustError;

#[derive(thiserror::Error, Debug)]
pub enum CertificateError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("unrecognized certificate: {0}")]
    Unrecognized(String),

    #[error("key id not found in the COSE headers")]
    KeyIdNotFound,

    #[error(transparent)]
    Trust(#[from] TrustError),

    #[error("unrecognized time format {0:?}")]
    InvalidReferenceTime(String),
}
