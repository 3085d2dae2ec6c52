// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

use base64::Engine as _;

pub fn b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Serve one canned response per connection, in order, then stop.
///
/// The join handle yields the raw request heads so tests can assert on paths
/// and headers.
pub fn spawn_http_server(responses: Vec<(u16, String)>) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local_addr");

    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for (status_code, body) in responses {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).unwrap_or(0);
            requests.push(String::from_utf8_lossy(&buf[..n]).to_string());

            let status_line = match status_code {
                200 => "HTTP/1.1 200 OK".to_string(),
                404 => "HTTP/1.1 404 Not Found".to_string(),
                500 => "HTTP/1.1 500 Internal Server Error".to_string(),
                other => format!("HTTP/1.1 {other} Status"),
            };
            let resp = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.as_bytes().len()
            );
            let _ = stream.write_all(resp.as_bytes());
        }
        requests
    });

    (format!("http://{addr}/"), handle)
}

/// A self-signed P-256 certificate (DER, PEM) and its uncompressed public point.
pub fn p256_certificate() -> (Vec<u8>, String, Vec<u8>) {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["dsc.example".to_string()]).expect("rcgen");
    (cert.der().to_vec(), cert.pem(), key_pair.public_key_raw().to_vec())
}

/// A fresh P-256 SubjectPublicKeyInfo (DER) and its uncompressed point.
pub fn p256_spki() -> (Vec<u8>, Vec<u8>) {
    use p256::pkcs8::EncodePublicKey as _;

    let sk = p256::ecdsa::SigningKey::random(&mut rand_core::OsRng);
    let vk = sk.verifying_key();
    let spki = vk.to_public_key_der().expect("spki").as_bytes().to_vec();
    let point = vk.to_encoded_point(false).as_bytes().to_vec();
    (spki, point)
}
