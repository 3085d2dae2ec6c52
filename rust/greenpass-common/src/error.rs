// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("decompression failed: {0}")]
    Decompression(String),

    #[error("COSE decode failed: {0}")]
    CoseDecode(String),
}
