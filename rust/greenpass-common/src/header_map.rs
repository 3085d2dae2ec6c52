// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use minicbor::Decoder;

use crate::cbor_value::{decode_map_from_decoder, CborKey, CborMap, CborValue};

/// COSE header label for the signature algorithm.
pub const HEADER_ALG: i64 = 1;
/// COSE header label for the key identifier.
pub const HEADER_KID: i64 = 4;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CoseHeaderMap {
    encoded_map_cbor: Vec<u8>,
    map: CborMap,
}

impl CoseHeaderMap {
    pub fn encoded_map_cbor(&self) -> &[u8] {
        &self.encoded_map_cbor
    }

    pub fn get(&self, label: i64) -> Option<&CborValue> {
        self.map.get(&CborKey::Int(label))
    }

    pub fn get_i64(&self, label: i64) -> Option<i64> {
        self.get(label).and_then(CborValue::as_i64)
    }

    pub fn get_bytes(&self, label: i64) -> Option<&[u8]> {
        self.get(label).and_then(CborValue::as_bytes)
    }

    pub fn map(&self) -> &CborMap {
        &self.map
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub(crate) fn from_parts(encoded_map_cbor: Vec<u8>, map: CborMap) -> Self {
        Self { encoded_map_cbor, map }
    }
}

pub(crate) fn decode_header_map_from_cbor(bytes: &[u8]) -> Result<CborMap, String> {
    // Empty bstr means empty map for protected headers.
    if bytes.is_empty() {
        return Ok(CborMap::new());
    }

    let mut dec = Decoder::new(bytes);
    let map = decode_map_from_decoder(&mut dec)?;

    if dec.position() != bytes.len() {
        return Err("trailing bytes after header map".to_string());
    }

    Ok(map)
}
