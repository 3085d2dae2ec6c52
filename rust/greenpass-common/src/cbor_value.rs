// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Generic CBOR data model used for header maps and certificate payloads.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use minicbor::data::Type;
use minicbor::{Decoder, Encoder};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CborKey {
    Int(i64),
    Text(String),
}

impl From<i64> for CborKey {
    fn from(i: i64) -> Self {
        CborKey::Int(i)
    }
}

impl From<&str> for CborKey {
    fn from(s: &str) -> Self {
        CborKey::Text(s.to_string())
    }
}

pub type CborMap = BTreeMap<CborKey, CborValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum CborValue {
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<CborValue>),
    Map(CborMap),
    Bool(bool),
    Null,
}

impl CborValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CborValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CborValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CborValue::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[CborValue]> {
        match self {
            CborValue::Array(a) => Some(a.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&CborMap> {
        match self {
            CborValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up `key` when this value is a map.
    pub fn get(&self, key: impl Into<CborKey>) -> Option<&CborValue> {
        self.as_map().and_then(|m| m.get(&key.into()))
    }

    /// Render as JSON for raw dumps. Byte strings become standard base64 text
    /// and integer map keys become their decimal string.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CborValue::Int(i) => serde_json::Value::from(*i),
            CborValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CborValue::Bytes(b) => serde_json::Value::String(STANDARD.encode(b)),
            CborValue::Text(s) => serde_json::Value::String(s.clone()),
            CborValue::Array(a) => serde_json::Value::Array(a.iter().map(CborValue::to_json).collect()),
            CborValue::Map(m) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in m {
                    let key = match k {
                        CborKey::Int(i) => i.to_string(),
                        CborKey::Text(s) => s.clone(),
                    };
                    obj.insert(key, v.to_json());
                }
                serde_json::Value::Object(obj)
            }
            CborValue::Bool(b) => serde_json::Value::Bool(*b),
            CborValue::Null => serde_json::Value::Null,
        }
    }
}

/// Decode a complete CBOR item from `bytes`, rejecting trailing data.
pub fn decode_value(bytes: &[u8]) -> Result<CborValue, String> {
    let mut dec = Decoder::new(bytes);
    let value = decode_value_from_decoder(&mut dec)?;
    if dec.position() != bytes.len() {
        return Err("trailing bytes after CBOR item".to_string());
    }
    Ok(value)
}

/// Deepest array/map/tag nesting accepted when decoding.
pub const MAX_NESTING_DEPTH: usize = 64;

pub(crate) fn decode_map_from_decoder(dec: &mut Decoder<'_>) -> Result<CborMap, String> {
    decode_map_at(dec, 0)
}

pub(crate) fn decode_value_from_decoder(dec: &mut Decoder<'_>) -> Result<CborValue, String> {
    decode_value_at(dec, 0)
}

fn decode_map_at(dec: &mut Decoder<'_>, depth: usize) -> Result<CborMap, String> {
    if depth >= MAX_NESTING_DEPTH {
        return Err("CBOR nesting too deep".to_string());
    }
    let len = dec
        .map()
        .map_err(|e| format!("failed to read map: {e}"))?
        .ok_or_else(|| "indefinite-length maps are not supported".to_string())?;

    let mut map = BTreeMap::new();
    for _ in 0..len {
        let key = decode_key(dec)?;
        let value = decode_value_at(dec, depth + 1)?;
        map.insert(key, value);
    }
    Ok(map)
}

fn decode_key(dec: &mut Decoder<'_>) -> Result<CborKey, String> {
    match dec.datatype().map_err(|e| e.to_string())? {
        Type::I8
        | Type::I16
        | Type::I32
        | Type::I64
        | Type::Int
        | Type::U8
        | Type::U16
        | Type::U32
        | Type::U64 => {
            let i = dec
                .i64()
                .map_err(|e| format!("failed to decode int map key: {e}"))?;
            Ok(CborKey::Int(i))
        }
        Type::String => {
            let s = dec
                .str()
                .map_err(|e| format!("failed to decode text map key: {e}"))?;
            Ok(CborKey::Text(s.to_string()))
        }
        other => Err(format!("unsupported map key type: {other:?}")),
    }
}

fn decode_value_at(dec: &mut Decoder<'_>, depth: usize) -> Result<CborValue, String> {
    if depth >= MAX_NESTING_DEPTH {
        return Err("CBOR nesting too deep".to_string());
    }
    match dec.datatype().map_err(|e| e.to_string())? {
        Type::Null | Type::Undefined => {
            dec.skip().map_err(|e| e.to_string())?;
            Ok(CborValue::Null)
        }
        Type::Bool => {
            let b = dec.bool().map_err(|e| e.to_string())?;
            Ok(CborValue::Bool(b))
        }
        Type::Bytes => {
            let b = dec.bytes().map_err(|e| e.to_string())?;
            Ok(CborValue::Bytes(b.to_vec()))
        }
        Type::String => {
            let s = dec.str().map_err(|e| e.to_string())?;
            Ok(CborValue::Text(s.to_string()))
        }
        Type::I8
        | Type::I16
        | Type::I32
        | Type::I64
        | Type::Int
        | Type::U8
        | Type::U16
        | Type::U32
        | Type::U64 => {
            let i = dec.i64().map_err(|e| e.to_string())?;
            Ok(CborValue::Int(i))
        }
        Type::F32 => {
            let f = dec.f32().map_err(|e| e.to_string())?;
            Ok(CborValue::Float(f64::from(f)))
        }
        Type::F64 => {
            let f = dec.f64().map_err(|e| e.to_string())?;
            Ok(CborValue::Float(f))
        }
        // Payload tags (e.g. tdate 0, epoch 1) carry no meaning for the mapper.
        Type::Tag => {
            dec.tag().map_err(|e| e.to_string())?;
            decode_value_at(dec, depth + 1)
        }
        Type::Array => {
            let len = dec
                .array()
                .map_err(|e| format!("failed to read array: {e}"))?
                .ok_or_else(|| "indefinite-length arrays are not supported".to_string())?;
            let mut out = Vec::with_capacity(len.min(256) as usize);
            for _ in 0..len {
                out.push(decode_value_at(dec, depth + 1)?);
            }
            Ok(CborValue::Array(out))
        }
        Type::Map => Ok(CborValue::Map(decode_map_at(dec, depth)?)),
        other => Err(format!("unsupported CBOR value type: {other:?}")),
    }
}

/// Encode a value with definite lengths, emitting map entries in key order.
pub fn encode_value(value: &CborValue) -> Result<Vec<u8>, String> {
    let mut enc = Encoder::new(Vec::new());
    encode_into(&mut enc, value)?;
    Ok(enc.into_writer())
}

pub(crate) fn encode_into(enc: &mut Encoder<Vec<u8>>, value: &CborValue) -> Result<(), String> {
    match value {
        CborValue::Int(i) => {
            enc.i64(*i).map_err(|e| e.to_string())?;
        }
        CborValue::Float(f) => {
            enc.f64(*f).map_err(|e| e.to_string())?;
        }
        CborValue::Bytes(b) => {
            enc.bytes(b).map_err(|e| e.to_string())?;
        }
        CborValue::Text(s) => {
            enc.str(s).map_err(|e| e.to_string())?;
        }
        CborValue::Array(items) => {
            enc.array(items.len() as u64).map_err(|e| e.to_string())?;
            for it in items {
                encode_into(enc, it)?;
            }
        }
        CborValue::Map(m) => encode_map_into(enc, m)?,
        CborValue::Bool(b) => {
            enc.bool(*b).map_err(|e| e.to_string())?;
        }
        CborValue::Null => {
            enc.null().map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

pub(crate) fn encode_map_into(enc: &mut Encoder<Vec<u8>>, map: &CborMap) -> Result<(), String> {
    enc.map(map.len() as u64).map_err(|e| e.to_string())?;
    for (k, v) in map {
        match k {
            CborKey::Int(i) => {
                enc.i64(*i).map_err(|e| e.to_string())?;
            }
            CborKey::Text(s) => {
                enc.str(s).map_err(|e| e.to_string())?;
            }
        }
        encode_into(enc, v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CborValue {
        let mut name = CborMap::new();
        name.insert("fn".into(), CborValue::Text("Rossi".to_string()));
        let mut root = CborMap::new();
        root.insert(CborKey::Int(-260), CborValue::Map(name));
        root.insert(CborKey::Int(4), CborValue::Int(1_700_000_000));
        root.insert("sig".into(), CborValue::Bytes(vec![0xde, 0xad]));
        CborValue::Map(root)
    }

    #[test]
    fn encoded_value_decodes_to_same_model() {
        let v = sample();
        assert_eq!(decode_value(&encode_value(&v).unwrap()).unwrap(), v);
    }

    #[test]
    fn json_rendering_stringifies_keys_and_bytes() {
        let json = sample().to_json();
        assert_eq!(json["-260"]["fn"], "Rossi");
        assert_eq!(json["4"], 1_700_000_000);
        assert_eq!(json["sig"], "3q0=");
    }

    #[test]
    fn rejects_trailing_data() {
        assert!(decode_value(&[0xa0, 0x00]).is_err());
    }
}
