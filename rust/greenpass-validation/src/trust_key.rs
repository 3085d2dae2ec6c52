// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Issuer verification keys.
//!
//! Trust sources publish keys in different wrappers: a DER X.509 certificate,
//! a DER SubjectPublicKeyInfo, or the bare SEC1 point. All of them reduce to
//! the 65-byte uncompressed P-256 point `0x04 || X || Y`.

use x509_parser::prelude::FromDer as _;
use x509_parser::x509::SubjectPublicKeyInfo;

use crate::CoseAlgorithm;

pub const UNCOMPRESSED_POINT_LEN: usize = 65;
const SEC1_UNCOMPRESSED_TAG: u8 = 0x04;

const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("unsupported key material: {0}")]
    Unsupported(String),

    #[error("invalid P-256 point: {0}")]
    InvalidPoint(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Curve {
    P256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustKey {
    pub key_id: Vec<u8>,
    pub x: [u8; 32],
    pub y: [u8; 32],
}

impl TrustKey {
    pub fn curve(&self) -> Curve {
        Curve::P256
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        CoseAlgorithm::ES256
    }

    /// Build a key from an uncompressed SEC1 point, checking it lies on the curve.
    pub fn from_uncompressed_point(key_id: &[u8], point: &[u8]) -> Result<Self, KeyError> {
        if point.len() != UNCOMPRESSED_POINT_LEN || point[0] != SEC1_UNCOMPRESSED_TAG {
            return Err(KeyError::InvalidPoint(format!(
                "expected {UNCOMPRESSED_POINT_LEN} bytes starting with 0x04, got {} bytes",
                point.len()
            )));
        }
        p256::PublicKey::from_sec1_bytes(point).map_err(|e| KeyError::InvalidPoint(e.to_string()))?;

        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        x.copy_from_slice(&point[1..33]);
        y.copy_from_slice(&point[33..65]);
        Ok(Self { key_id: key_id.to_vec(), x, y })
    }

    /// Build a key from whatever a trust source published.
    pub fn from_key_material(key_id: &[u8], material: &[u8]) -> Result<Self, KeyError> {
        let point = extract_ec_point(material)?;
        Self::from_uncompressed_point(key_id, &point)
    }

    pub fn uncompressed_point(&self) -> [u8; UNCOMPRESSED_POINT_LEN] {
        let mut out = [0u8; UNCOMPRESSED_POINT_LEN];
        out[0] = SEC1_UNCOMPRESSED_TAG;
        out[1..33].copy_from_slice(&self.x);
        out[33..].copy_from_slice(&self.y);
        out
    }

    pub fn verifying_key(&self) -> Result<p256::ecdsa::VerifyingKey, KeyError> {
        p256::ecdsa::VerifyingKey::from_sec1_bytes(&self.uncompressed_point())
            .map_err(|e| KeyError::InvalidPoint(e.to_string()))
    }
}

/// Extract the raw EC point from a DER certificate, a DER SPKI or raw point bytes.
pub fn extract_ec_point(material: &[u8]) -> Result<Vec<u8>, KeyError> {
    if let Ok((_, cert)) = x509_parser::parse_x509_certificate(material) {
        return spki_point(&cert.tbs_certificate.subject_pki);
    }

    if let Ok((_, spki)) = SubjectPublicKeyInfo::from_der(material) {
        return spki_point(&spki);
    }

    if material.len() == UNCOMPRESSED_POINT_LEN && material[0] == SEC1_UNCOMPRESSED_TAG {
        return Ok(material.to_vec());
    }

    Err(KeyError::Unsupported(format!(
        "{} bytes are neither a certificate, an SPKI nor an uncompressed point",
        material.len()
    )))
}

fn spki_point(spki: &SubjectPublicKeyInfo<'_>) -> Result<Vec<u8>, KeyError> {
    let oid = spki.algorithm.algorithm.to_string();
    if oid != OID_EC_PUBLIC_KEY {
        return Err(KeyError::Unsupported(format!("public key algorithm {oid} is not EC")));
    }
    Ok(spki.subject_public_key.data.to_vec())
}
