// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// COSE algorithms accepted for certificate signatures.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i64)]
pub enum CoseAlgorithm {
    /// ECDSA w/ SHA-256 over P-256.
    ES256 = -7,
}

impl CoseAlgorithm {
    /// Resolve the `alg` header. A missing header means ES256.
    pub fn from_header(alg: Option<i64>) -> Result<Self, i64> {
        match alg {
            None | Some(-7) => Ok(CoseAlgorithm::ES256),
            Some(other) => Err(other),
        }
    }

    pub fn name(self) -> &'static str {
        algorithm_name(self as i64)
    }
}

/// IANA name of a COSE signature algorithm id, for display.
pub fn algorithm_name(alg: i64) -> &'static str {
    match alg {
        -7 => "ES256",
        -35 => "ES384",
        -36 => "ES512",
        -37 => "PS256",
        -38 => "PS384",
        -39 => "PS512",
        -257 => "RS256",
        -8 => "EdDSA",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspecified_alg_is_es256() {
        assert_eq!(CoseAlgorithm::from_header(None), Ok(CoseAlgorithm::ES256));
        assert_eq!(CoseAlgorithm::from_header(Some(-7)), Ok(CoseAlgorithm::ES256));
        assert_eq!(CoseAlgorithm::from_header(Some(-37)), Err(-37));
        assert_eq!(algorithm_name(-37), "PS256");
    }
}
