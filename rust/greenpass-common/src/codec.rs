// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Text payload codec: `PREFIX:` + base-45( zlib( COSE_Sign1 ) ).

use std::collections::BTreeSet;
use std::io::{Read as _, Write as _};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::{debug, warn};

use crate::base45;
use crate::cbor_value::{decode_value, CborValue};
use crate::cose_sign1::{parse_cose_sign1, CoseMessage};
use crate::error::CodecError;

/// Upper bound on the inflated COSE message size.
pub const MAX_DECOMPRESSED_LEN: u64 = 1024 * 1024;

/// Output of [`decode`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedText {
    pub message: CoseMessage,
    /// Characters of the payload (after the prefix) outside the base-45 alphabet.
    pub non_base45_chars: BTreeSet<char>,
}

/// Split `text` at the first `:` and return the base-45 body.
///
/// The body itself may contain `:` since it is part of the base-45 alphabet.
fn strip_prefix(text: &str) -> Result<&str, CodecError> {
    text.split_once(':')
        .map(|(_, rest)| rest)
        .ok_or_else(|| CodecError::MalformedInput("missing scheme prefix separator ':'".to_string()))
}

pub fn decode(text: &str) -> Result<DecodedText, CodecError> {
    let non_base45_chars = base45::non_base45_chars(strip_prefix(text)?);
    if !non_base45_chars.is_empty() {
        debug!(chars = ?non_base45_chars, "payload contains characters outside the base-45 alphabet");
    }

    let body = strip_prefix(text.trim())?;
    let compressed = base45::decode(body)?;
    let cose_bytes = inflate(&compressed)?;
    let message = parse_cose_sign1(&cose_bytes).map_err(CodecError::CoseDecode)?;

    debug!(
        compressed_len = compressed.len(),
        cose_len = cose_bytes.len(),
        payload_len = message.payload.len(),
        "decoded certificate text"
    );

    Ok(DecodedText { message, non_base45_chars })
}

/// CBOR-decode the COSE payload.
pub fn decode_payload(message: &CoseMessage) -> Result<CborValue, CodecError> {
    decode_value(&message.payload).map_err(|e| CodecError::CoseDecode(format!("payload: {e}")))
}

fn inflate(compressed: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    ZlibDecoder::new(compressed)
        .take(MAX_DECOMPRESSED_LEN + 1)
        .read_to_end(&mut out)
        .map_err(|e| {
            warn!(error = %e, "zlib stream rejected");
            CodecError::Decompression(e.to_string())
        })?;
    if out.len() as u64 > MAX_DECOMPRESSED_LEN {
        return Err(CodecError::Decompression(format!(
            "inflated message exceeds {MAX_DECOMPRESSED_LEN} bytes"
        )));
    }
    Ok(out)
}

/// Produce the text form of an encoded COSE_Sign1 message.
pub fn encode(prefix: &str, cose_bytes: &[u8]) -> Result<String, CodecError> {
    let mut z = ZlibEncoder::new(Vec::new(), Compression::best());
    z.write_all(cose_bytes)
        .map_err(|e| CodecError::Decompression(e.to_string()))?;
    let compressed = z
        .finish()
        .map_err(|e| CodecError::Decompression(e.to_string()))?;
    Ok(format!("{prefix}:{}", base45::encode(&compressed)))
}
