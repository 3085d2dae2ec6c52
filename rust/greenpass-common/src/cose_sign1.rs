// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! COSE_Sign1 parsing and Sig_structure encoding.
//!
//! ```text
//! COSE_Sign1 = [ protected : bstr,
//!               unprotected : map,
//!               payload : bstr,
//!               signature : bstr ]
//! ```
//!
//! Health certificates are sometimes wrapped in a CWT tag (61) in front of the
//! COSE_Sign1 tag (18). Both tags are optional, in that order.

use minicbor::data::{Tag, Type};
use minicbor::{Decoder, Encoder};

use crate::cbor_value::{decode_map_from_decoder, encode_map_into, CborMap};
use crate::header_map::{decode_header_map_from_cbor, CoseHeaderMap, HEADER_ALG, HEADER_KID};

pub const CWT_TAG: u64 = 61;
pub const COSE_SIGN1_TAG: u64 = 18;
pub const SIG_STRUCTURE_CONTEXT_SIGNATURE1: &str = "Signature1";

/// A decoded single-signer COSE message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoseMessage {
    pub protected_headers: CoseHeaderMap,
    pub unprotected_headers: CoseHeaderMap,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl CoseMessage {
    /// Key identifier, protected headers first.
    pub fn key_id(&self) -> Option<&[u8]> {
        self.protected_headers
            .get_bytes(HEADER_KID)
            .or_else(|| self.unprotected_headers.get_bytes(HEADER_KID))
    }

    /// Raw `alg` header value, protected headers first.
    pub fn algorithm(&self) -> Option<i64> {
        self.protected_headers
            .get_i64(HEADER_ALG)
            .or_else(|| self.unprotected_headers.get_i64(HEADER_ALG))
    }
}

pub fn parse_cose_sign1(input: &[u8]) -> Result<CoseMessage, String> {
    if input.is_empty() {
        return Err("empty input".to_string());
    }

    let mut dec = Decoder::new(input);

    let mut allowed_tags = [CWT_TAG, COSE_SIGN1_TAG].into_iter();
    while matches!(dec.datatype().map_err(|e| e.to_string())?, Type::Tag) {
        let tag = dec.tag().map_err(|e| format!("failed to read CBOR tag: {e}"))?;
        if !allowed_tags.any(|t| tag == Tag::new(t)) {
            return Err(format!(
                "unexpected CBOR tag {} (expected CWT 61 and/or COSE_Sign1 18)",
                tag.as_u64()
            ));
        }
    }

    let len = dec
        .array()
        .map_err(|e| format!("top-level item is not an array: {e}"))?
        .ok_or_else(|| "indefinite-length arrays are not supported".to_string())?;

    if len != 4 {
        return Err("array length was not 4".to_string());
    }

    let protected_bstr = dec
        .bytes()
        .map_err(|e| format!("failed to read protected headers (bstr): {e}"))?
        .to_vec();

    let protected_map = decode_header_map_from_cbor(&protected_bstr)
        .map_err(|e| format!("failed to parse protected headers: {e}"))?;

    if !matches!(dec.datatype().map_err(|e| e.to_string())?, Type::Map) {
        return Err("unprotected headers are not a map".to_string());
    }

    let unprotected_map = decode_map_from_decoder(&mut dec)
        .map_err(|e| format!("failed to parse unprotected headers map: {e}"))?;

    let payload = dec
        .bytes()
        .map_err(|e| format!("failed to read payload (bstr): {e}"))?
        .to_vec();

    let signature = dec
        .bytes()
        .map_err(|e| format!("failed to read signature (bstr): {e}"))?
        .to_vec();

    if dec.position() != input.len() {
        return Err("trailing bytes after COSE_Sign1".to_string());
    }

    Ok(CoseMessage {
        protected_headers: CoseHeaderMap::from_parts(protected_bstr, protected_map),
        unprotected_headers: CoseHeaderMap::from_parts(Vec::new(), unprotected_map),
        payload,
        signature,
    })
}

/// Encode the `Sig_structure` that a COSE_Sign1 signer signs.
pub fn encode_signature1_sig_structure(msg: &CoseMessage) -> Result<Vec<u8>, String> {
    let protected = msg.protected_headers.encoded_map_cbor();
    let mut enc = Encoder::new(Vec::with_capacity(32 + protected.len() + msg.payload.len()));
    enc.array(4).map_err(|e| e.to_string())?;
    enc.str(SIG_STRUCTURE_CONTEXT_SIGNATURE1).map_err(|e| e.to_string())?;
    enc.bytes(protected).map_err(|e| e.to_string())?;
    enc.bytes(&[]).map_err(|e| e.to_string())?; // external_aad empty bstr
    enc.bytes(&msg.payload).map_err(|e| e.to_string())?;
    Ok(enc.into_writer())
}

/// Encode an untagged COSE_Sign1 from its parts.
///
/// `protected` is the already-encoded protected header map.
pub fn encode_cose_sign1(
    protected: &[u8],
    unprotected: &CborMap,
    payload: &[u8],
    signature: &[u8],
) -> Result<Vec<u8>, String> {
    let mut enc = Encoder::new(Vec::new());
    enc.array(4).map_err(|e| e.to_string())?;
    enc.bytes(protected).map_err(|e| e.to_string())?;
    encode_map_into(&mut enc, unprotected)?;
    enc.bytes(payload).map_err(|e| e.to_string())?;
    enc.bytes(signature).map_err(|e| e.to_string())?;
    Ok(enc.into_writer())
}
