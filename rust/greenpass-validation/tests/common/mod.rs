// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared helpers for signature verification tests.

#![allow(dead_code)]

use greenpass_common::{encode_cose_sign1, parse_cose_sign1, CborMap, CoseMessage};
use minicbor::Encoder;
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::SigningKey;

pub(crate) const KID: &[u8] = b"\x01\x02\x03\x04\x05\x06\x07\x08";

pub(crate) fn random_signing_key() -> SigningKey {
    SigningKey::random(&mut rand_core::OsRng)
}

pub(crate) fn uncompressed_point(sk: &SigningKey) -> Vec<u8> {
    sk.verifying_key().to_encoded_point(false).as_bytes().to_vec()
}

/// Protected header `{1: alg, 4: kid}`; `alg` is omitted when `None`.
pub(crate) fn protected_header(alg: Option<i64>, kid: &[u8]) -> Vec<u8> {
    let mut enc = Encoder::new(Vec::new());
    enc.map(if alg.is_some() { 2 } else { 1 }).unwrap();
    if let Some(alg) = alg {
        enc.i64(1).unwrap();
        enc.i64(alg).unwrap();
    }
    enc.i64(4).unwrap();
    enc.bytes(kid).unwrap();
    enc.into_writer()
}

/// Sign `payload` as a COSE_Sign1 and parse it back.
pub(crate) fn signed_message(sk: &SigningKey, protected: &[u8], payload: &[u8]) -> CoseMessage {
    let sig_structure = {
        let mut enc = Encoder::new(Vec::new());
        enc.array(4).unwrap();
        enc.str("Signature1").unwrap();
        enc.bytes(protected).unwrap();
        enc.bytes(&[]).unwrap();
        enc.bytes(payload).unwrap();
        enc.into_writer()
    };
    let sig: p256::ecdsa::Signature = sk.sign(&sig_structure);
    let cose = encode_cose_sign1(protected, &CborMap::new(), payload, &sig.to_bytes()).unwrap();
    parse_cose_sign1(&cose).unwrap()
}
