// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Decoding layers of a digital health certificate text payload.
//!
//! `HC1:` + base-45 + zlib + COSE_Sign1 + CBOR payload. The verification and
//! trust crates build on the types exported here.

pub mod base45;
pub mod cbor_value;
pub mod codec;
pub mod cose_sign1;
pub mod error;
pub mod header_map;

pub use cbor_value::{decode_value, encode_value, CborKey, CborMap, CborValue, MAX_NESTING_DEPTH};
pub use codec::{decode, decode_payload, encode, DecodedText};
pub use cose_sign1::{encode_cose_sign1, encode_signature1_sig_structure, parse_cose_sign1, CoseMessage};
pub use error::CodecError;
pub use header_map::{CoseHeaderMap, HEADER_ALG, HEADER_KID};
