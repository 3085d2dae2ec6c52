// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use greenpass_validation::KeyError;

#[derive(thiserror::Error, Debug)]
pub enum TrustError {
    #[error("api request to {url} failed: {reason}")]
    Api { url: String, reason: String },

    #[error("unknown certification authority for key id {key_id}")]
    UnknownCertificationAuthority { key_id: String },

    #[error("unparseable trust source response: {0}")]
    Parse(String),

    #[error("unusable issuer key: {0}")]
    Key(#[from] KeyError),

    #[error("cache io failed for {path}: {reason}")]
    Cache { path: String, reason: String },

    #[error("cannot read key file {path}: {reason}")]
    KeyFile { path: String, reason: String },
}

impl TrustError {
    pub(crate) fn api(url: &str, reason: impl Into<String>) -> Self {
        TrustError::Api {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}
