// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Base-45 encoding (RFC 9285).
//!
//! Every two input bytes are encoded as three characters and a trailing single
//! byte as two characters. Character values are little-endian base-45 digits.

use std::collections::BTreeSet;

use crate::error::CodecError;

pub const BASE45_ALPHABET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

fn digit_value(c: u8) -> Option<u32> {
    BASE45_ALPHABET.iter().position(|&a| a == c).map(|p| p as u32)
}

/// Returns true when every character of `text` belongs to the base-45 alphabet.
pub fn is_base45(text: &str) -> bool {
    text.bytes().all(|b| digit_value(b).is_some())
}

/// Collect the characters of `text` that are not part of the base-45 alphabet.
pub fn non_base45_chars(text: &str) -> BTreeSet<char> {
    text.chars()
        .filter(|c| !c.is_ascii() || digit_value(*c as u8).is_none())
        .collect()
}

pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    let input = text.as_bytes();
    if input.len() % 3 == 1 {
        return Err(CodecError::MalformedInput(format!(
            "base-45 input length {} leaves a dangling character",
            input.len()
        )));
    }

    let mut digits = Vec::with_capacity(input.len());
    for (pos, &b) in input.iter().enumerate() {
        let d = digit_value(b).ok_or_else(|| {
            CodecError::MalformedInput(format!(
                "invalid base-45 character {:?} at offset {pos}",
                b as char
            ))
        })?;
        digits.push(d);
    }

    let mut out = Vec::with_capacity(input.len() / 3 * 2 + 1);
    for chunk in digits.chunks(3) {
        match *chunk {
            [c, d, e] => {
                let n = c + d * 45 + e * 45 * 45;
                if n > 0xFFFF {
                    return Err(CodecError::MalformedInput(format!(
                        "base-45 triplet value {n} exceeds 16 bits"
                    )));
                }
                out.push((n >> 8) as u8);
                out.push((n & 0xFF) as u8);
            }
            [c, d] => {
                let n = c + d * 45;
                if n > 0xFF {
                    return Err(CodecError::MalformedInput(format!(
                        "base-45 trailing pair value {n} exceeds 8 bits"
                    )));
                }
                out.push(n as u8);
            }
            _ => unreachable!("length checked above"),
        }
    }

    Ok(out)
}

pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() / 2 * 3 + 2);
    for chunk in bytes.chunks(2) {
        let (mut n, width) = match *chunk {
            [a, b] => ((u32::from(a) << 8) | u32::from(b), 3),
            [a] => (u32::from(a), 2),
            _ => unreachable!("chunks(2) yields one or two bytes"),
        };
        for _ in 0..width {
            out.push(BASE45_ALPHABET[(n % 45) as usize] as char);
            n /= 45;
        }
    }
    out
}
