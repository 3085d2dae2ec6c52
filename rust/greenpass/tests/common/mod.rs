// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Certificate builders, a fixed clock and in-memory trust for verifier tests.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

use chrono::{DateTime, Duration, TimeZone, Utc};
use greenpass::{RuleEngine, Verifier};
use greenpass_common::{
    encode, encode_cose_sign1, encode_signature1_sig_structure, encode_value, parse_cose_sign1, CborKey, CborMap,
    CborValue,
};
use greenpass_trust::{DayWindow, HourWindow, KeyResolver, TrustError, TrustSettings, VaccineWindows};
use greenpass_validation::TrustKey;
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::SigningKey;

pub const KID: &[u8] = b"\x25\x3e\x1a\x0b\x44\x10\x9f\x01";
pub const COMIRNATY: &str = "EU/1/20/1528";
pub const BLOCKED_ID: &str = "URN:UVCI:01:IT:BLOCKED#1";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 11, 5, 12, 0, 0).unwrap()
}

pub fn days_ago(days: i64) -> String {
    (now() - Duration::days(days)).format("%Y-%m-%d").to_string()
}

pub fn hours_ago(hours: i64) -> String {
    (now() - Duration::hours(hours)).format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

pub fn signing_key() -> SigningKey {
    SigningKey::random(&mut rand_core::OsRng)
}

pub fn uncompressed_point(sk: &SigningKey) -> Vec<u8> {
    sk.verifying_key().to_encoded_point(false).as_bytes().to_vec()
}

/// Knows exactly one key, or none.
pub struct StaticResolver(pub Option<TrustKey>);

impl StaticResolver {
    pub fn for_key(sk: &SigningKey) -> Self {
        Self(Some(TrustKey::from_uncompressed_point(KID, &uncompressed_point(sk)).unwrap()))
    }
}

impl KeyResolver for StaticResolver {
    fn resolve_raw(&self, key_id: &[u8]) -> Result<Vec<u8>, TrustError> {
        match &self.0 {
            Some(key) if key.key_id == key_id => Ok(key.uncompressed_point().to_vec()),
            _ => Err(TrustError::UnknownCertificationAuthority {
                key_id: format!("{key_id:02x?}"),
            }),
        }
    }
}

pub fn settings() -> TrustSettings {
    let mut settings = TrustSettings::default();
    settings.vaccines.insert(
        COMIRNATY.to_string(),
        VaccineWindows {
            complete: DayWindow::new(0, 270),
            not_complete: DayWindow::new(15, 42),
            ..Default::default()
        },
    );
    settings.tests.molecular = HourWindow::new(0, 72);
    settings.tests.rapid = HourWindow::new(0, 48);
    settings.recovery.default = DayWindow::new(0, 180);
    settings.blocklist.insert(BLOCKED_ID.to_string());
    settings
}

pub fn rules() -> RuleEngine {
    RuleEngine::new(settings()).with_reference_time(now())
}

pub fn verifier_for(sk: &SigningKey) -> Verifier {
    Verifier::new(rules(), Box::new(StaticResolver::for_key(sk)))
}

pub fn text(s: &str) -> CborValue {
    CborValue::Text(s.to_string())
}

pub fn map(entries: Vec<(&str, CborValue)>) -> CborValue {
    CborValue::Map(entries.into_iter().map(|(k, v)| (CborKey::from(k), v)).collect())
}

fn entry_common(id: &str) -> Vec<(&'static str, CborValue)> {
    vec![
        ("tg", text("840539006")),
        ("co", text("IT")),
        ("is", text("Ministero della Salute")),
        ("ci", text(id)),
    ]
}

pub fn vaccine_entry(date: &str, dn: i64, sd: i64, product: &str) -> CborValue {
    let mut fields = entry_common("URN:UVCI:01:IT:VACCINE#1");
    fields.extend([
        ("vp", text("1119349007")),
        ("mp", text(product)),
        ("ma", text("ORG-100030215")),
        ("dn", CborValue::Int(dn)),
        ("sd", CborValue::Int(sd)),
        ("dt", text(date)),
    ]);
    map(fields)
}

pub fn test_entry(collected: &str, test_type: &str, result: &str) -> CborValue {
    let mut fields = entry_common("URN:UVCI:01:IT:TEST#1");
    fields.extend([
        ("tt", text(test_type)),
        ("sc", text(collected)),
        ("tr", text(result)),
        ("tc", text("Farmacia Centrale")),
        ("ma", text("1232")),
    ]);
    map(fields)
}

pub fn recovery_entry(id: &str, from: &str, until: &str) -> CborValue {
    let mut fields = entry_common(id);
    fields.extend([("fr", text(from)), ("df", text(from)), ("du", text(until))]);
    map(fields)
}

/// Full CWT payload with `entries` under `kind` (`v`, `t` or `r`).
pub fn payload(kind: &str, entries: Vec<CborValue>) -> CborValue {
    let hcert = map(vec![
        ("ver", text("1.3.0")),
        ("dob", text("1980-01-01")),
        ("nam", map(vec![("gn", text("Mario")), ("fn", text("Rossi"))])),
        (kind, CborValue::Array(entries)),
    ]);
    let mut claims = CborMap::new();
    claims.insert(CborKey::Int(1), text("IT"));
    claims.insert(CborKey::Int(4), CborValue::Int(now().timestamp() + 86_400 * 365));
    claims.insert(CborKey::Int(6), CborValue::Int(now().timestamp() - 86_400 * 30));
    claims.insert(CborKey::Int(-260), CborValue::Map(CborMap::from([(CborKey::Int(1), hcert)])));
    CborValue::Map(claims)
}

/// Sign `payload` with ES256 under [`KID`] and return the `HC1:` text.
pub fn sign(sk: &SigningKey, payload: &CborValue) -> String {
    let mut protected = CborMap::new();
    protected.insert(CborKey::Int(1), CborValue::Int(-7));
    protected.insert(CborKey::Int(4), CborValue::Bytes(KID.to_vec()));
    let protected = encode_value(&CborValue::Map(protected)).unwrap();
    let payload = encode_value(payload).unwrap();

    let unsigned = encode_cose_sign1(&protected, &CborMap::new(), &payload, &[]).unwrap();
    let sig_structure = encode_signature1_sig_structure(&parse_cose_sign1(&unsigned).unwrap()).unwrap();
    let signature: p256::ecdsa::Signature = sk.sign(&sig_structure);

    let cose = encode_cose_sign1(&protected, &CborMap::new(), &payload, &signature.to_bytes()).unwrap();
    encode("HC1", &cose).unwrap()
}

/// Serve one canned response per connection, in order.
pub fn spawn_http_server(responses: Vec<(u16, String)>) -> (String, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local_addr");

    let handle = thread::spawn(move || {
        for (status_code, body) in responses {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let status_line = match status_code {
                200 => "HTTP/1.1 200 OK".to_string(),
                other => format!("HTTP/1.1 {other} Status"),
            };
            let resp = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.as_bytes().len()
            );
            let _ = stream.write_all(resp.as_bytes());
        }
    });

    (format!("http://{addr}/"), handle)
}
