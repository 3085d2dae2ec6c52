// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod common;

use common::*;
use greenpass::{inspect, CertificateKind, Stage, TestResult, Verifier};
use greenpass_common::{CborKey, CborValue};

#[test]
fn full_course_inside_complete_window_is_valid() {
    let sk = signing_key();
    let text = sign(&sk, &payload("v", vec![vaccine_entry(&days_ago(40), 2, 2, COMIRNATY)]));

    let outcome = verifier_for(&sk).verify(&text);
    assert!(outcome.verdict, "{:?}", outcome.diagnostics);

    let cert = &outcome.certificate;
    assert!(matches!(cert.kind, CertificateKind::Vaccine(_)));
    assert_eq!(cert.verified(), Some(true));
    assert!(!cert.expired());
    // Date-only values are midnight UTC; the clock reads noon.
    assert_eq!(cert.hours_to_valid(), Some(40.0 * 24.0 + 12.0));
    assert_eq!(cert.remaining_hours(), Some(270.0 * 24.0 - 972.0));
    assert_eq!(cert.key_id.as_deref(), Some(KID));
    assert_eq!(cert.signature_algorithm, Some(-7));
    assert_eq!(cert.personal_info.last_name, "Rossi");
    assert_eq!(cert.qr_info.issuing_country, "IT");
    assert_eq!(outcome.diagnostics.stage, Stage::Verdicted);
}

#[test]
fn partial_course_uses_not_complete_window() {
    let sk = signing_key();
    let text = sign(&sk, &payload("v", vec![vaccine_entry(&days_ago(10), 1, 2, COMIRNATY)]));

    let outcome = verifier_for(&sk).verify(&text);
    assert!(!outcome.verdict);
    assert!(outcome.certificate.expired());
    assert_eq!(outcome.certificate.hours_to_valid(), Some(252.0 - 15.0 * 24.0));
    assert_eq!(outcome.certificate.verified(), Some(true));
}

#[test]
fn unknown_vaccine_product_is_expired() {
    let sk = signing_key();
    let text = sign(&sk, &payload("v", vec![vaccine_entry(&days_ago(40), 2, 2, "EU/1/99/0000")]));

    let outcome = verifier_for(&sk).verify(&text);
    assert!(!outcome.verdict);
    assert!(outcome.certificate.expired());
}

#[test]
fn negative_test_inside_window_is_valid() {
    let sk = signing_key();
    let text = sign(&sk, &payload("t", vec![test_entry(&hours_ago(10), "LP217198-3", "260415000")]));

    let outcome = verifier_for(&sk).verify(&text);
    assert!(outcome.verdict, "{:?}", outcome.diagnostics);
    match &outcome.certificate.kind {
        CertificateKind::Test(t) => {
            assert_eq!(t.result, Some(TestResult::Negative));
            assert_eq!(t.testing_center.as_deref(), Some("Farmacia Centrale"));
        }
        other => panic!("unexpected kind {other:?}"),
    }
    assert_eq!(outcome.certificate.remaining_hours(), Some(38.0));
}

#[test]
fn positive_test_is_rejected() {
    let sk = signing_key();
    let text = sign(&sk, &payload("t", vec![test_entry(&hours_ago(10), "LP6464-4", "260373001")]));

    let outcome = verifier_for(&sk).verify(&text);
    assert!(!outcome.verdict);
    assert!(outcome.certificate.is_test_positive());
    assert_eq!(outcome.certificate.verified(), Some(true));
    assert!(!outcome.certificate.expired());
}

#[test]
fn unknown_test_result_is_not_penalised() {
    let sk = signing_key();
    let text = sign(&sk, &payload("t", vec![test_entry(&hours_ago(10), "LP6464-4", "999")]));

    let outcome = verifier_for(&sk).verify(&text);
    assert!(outcome.verdict);
}

#[test]
fn expired_test_is_rejected() {
    let sk = signing_key();
    let text = sign(&sk, &payload("t", vec![test_entry(&hours_ago(80), "LP6464-4", "260415000")]));

    let outcome = verifier_for(&sk).verify(&text);
    assert!(!outcome.verdict);
    assert!(outcome.certificate.expired());
}

#[test]
fn unparsable_collection_date_is_expired() {
    let sk = signing_key();
    let text = sign(&sk, &payload("t", vec![test_entry("last tuesday", "LP6464-4", "260415000")]));

    let outcome = verifier_for(&sk).verify(&text);
    assert!(!outcome.verdict);
    assert!(outcome.certificate.expired());
    assert!(matches!(outcome.certificate.kind, CertificateKind::Test(_)));
}

#[test]
fn more_than_one_entry_is_unknown() {
    let sk = signing_key();
    let entry = vaccine_entry(&days_ago(40), 2, 2, COMIRNATY);
    let text = sign(&sk, &payload("v", vec![entry.clone(), entry]));

    let outcome = verifier_for(&sk).verify(&text);
    assert!(!outcome.verdict);
    assert_eq!(outcome.certificate.kind, CertificateKind::Unknown);
    assert_eq!(outcome.certificate.assessment().and_then(|a| a.window), None);
    assert!(!outcome.certificate.expired());
    assert_eq!(outcome.certificate.verified(), Some(true));
}

#[test]
fn blocklisted_certificate_is_rejected() {
    let sk = signing_key();
    let text = sign(
        &sk,
        &payload("r", vec![recovery_entry(BLOCKED_ID, &days_ago(10), &days_ago(-100))]),
    );

    let outcome = verifier_for(&sk).verify(&text);
    assert!(!outcome.verdict);
    assert!(outcome.certificate.blocklisted());
    assert!(!outcome.certificate.expired());

    let lenient = Verifier::new(rules().with_blocklist(false), Box::new(StaticResolver::for_key(&sk)));
    assert!(lenient.verify(&text).verdict);
}

#[test]
fn recovery_expiration_is_enforced_when_enabled() {
    let sk = signing_key();
    let text = sign(
        &sk,
        &payload("r", vec![recovery_entry("URN:UVCI:01:IT:R#1", &days_ago(10), &days_ago(1))]),
    );

    let strict = Verifier::new(
        rules().with_recovery_expiration(true),
        Box::new(StaticResolver::for_key(&sk)),
    );
    let outcome = strict.verify(&text);
    assert!(!outcome.verdict);
    assert!(outcome.certificate.expired());

    let outcome = verifier_for(&sk).verify(&text);
    assert!(outcome.verdict);
    assert_eq!(outcome.certificate.remaining_hours(), Some(180.0 * 24.0 - 252.0));
}

#[test]
fn unresolvable_key_clears_verified() {
    let sk = signing_key();
    let text = sign(&sk, &payload("v", vec![vaccine_entry(&days_ago(40), 2, 2, COMIRNATY)]));

    let verifier = Verifier::new(rules(), Box::new(StaticResolver(None)));
    let outcome = verifier.verify(&text);
    assert!(!outcome.verdict);
    assert_eq!(outcome.certificate.verified(), Some(false));
    assert!(!outcome.certificate.expired());

    let check = outcome.diagnostics.signature_check.as_ref().unwrap();
    assert_eq!(check.first_error_code(), Some("KEY_RESOLUTION_FAILED"));
    assert_eq!(outcome.diagnostics.stage, Stage::Verdicted);
}

#[test]
fn foreign_signature_is_rejected() {
    let signer = signing_key();
    let published = signing_key();
    let text = sign(&signer, &payload("v", vec![vaccine_entry(&days_ago(40), 2, 2, COMIRNATY)]));

    let outcome = verifier_for(&published).verify(&text);
    assert!(!outcome.verdict);
    assert_eq!(outcome.certificate.verified(), Some(false));
    let check = outcome.diagnostics.signature_check.as_ref().unwrap();
    assert_eq!(check.first_error_code(), Some("BAD_SIGNATURE"));
}

#[test]
fn undecodable_text_is_rejected_without_error() {
    let verifier = verifier_for(&signing_key());
    for bad in ["", "no separator", "HC1:abc", "HC1:%%%%"] {
        let outcome = verifier.verify(bad);
        assert!(!outcome.verdict, "{bad}");
        assert_eq!(outcome.certificate.kind, CertificateKind::Unknown);
        assert_eq!(outcome.certificate.verified(), None);
        assert_eq!(outcome.diagnostics.stage, Stage::Start);
        assert!(!outcome.diagnostics.failures.is_empty());
    }
}

#[test]
fn payload_without_entries_is_unrecognized() {
    let sk = signing_key();
    let mut bare = payload("v", vec![]);
    if let CborValue::Map(claims) = &mut bare {
        let hcert = map(vec![
            ("ver", text("1.3.0")),
            ("dob", text("1980-01-01")),
            ("nam", map(vec![("gn", text("Mario")), ("fn", text("Rossi"))])),
        ]);
        let claim = greenpass_common::CborMap::from([(CborKey::Int(1), hcert)]);
        claims.insert(CborKey::Int(-260), CborValue::Map(claim));
    }
    let outcome = verifier_for(&sk).verify(&sign(&sk, &bare));
    assert!(!outcome.verdict);
    assert_eq!(outcome.diagnostics.stage, Stage::Decoded);
    assert!(outcome.diagnostics.failures[0].contains("unrecognized"));
}

#[test]
fn missing_given_name_is_unrecognized() {
    let sk = signing_key();
    let mut nameless = payload("v", vec![vaccine_entry(&days_ago(40), 2, 2, COMIRNATY)]);
    if let CborValue::Map(claims) = &mut nameless {
        let hcert = map(vec![
            ("ver", text("1.3.0")),
            ("dob", text("1980-01-01")),
            ("nam", map(vec![("fn", text("Rossi"))])),
            ("v", CborValue::Array(vec![vaccine_entry(&days_ago(40), 2, 2, COMIRNATY)])),
        ]);
        let claim = greenpass_common::CborMap::from([(CborKey::Int(1), hcert)]);
        claims.insert(CborKey::Int(-260), CborValue::Map(claim));
    }

    let outcome = verifier_for(&sk).verify(&sign(&sk, &nameless));
    assert!(!outcome.verdict);
    assert_eq!(outcome.certificate.kind, CertificateKind::Unknown);
    assert_eq!(outcome.diagnostics.stage, Stage::Decoded);
    assert!(outcome.diagnostics.failures[0].contains("missing given name"));
}

#[test]
fn non_ascii_date_offset_is_expired() {
    let sk = signing_key();
    let entry = test_entry("2021-11-05T08:30:00+1\u{e9}1", "LP6464-4", "260415000");
    let outcome = verifier_for(&sk).verify(&sign(&sk, &payload("t", vec![entry])));

    assert!(!outcome.verdict);
    assert!(outcome.certificate.expired());
    assert_eq!(outcome.certificate.verified(), Some(true));
}

#[test]
fn batch_verdict_is_the_conjunction() {
    let sk = signing_key();
    let good = sign(&sk, &payload("v", vec![vaccine_entry(&days_ago(40), 2, 2, COMIRNATY)]));
    let verifier = verifier_for(&sk);

    let all_good = verifier.verify_batch(&[good.as_str(), good.as_str()]);
    assert!(all_good.verdict);
    assert_eq!(all_good.outcomes.len(), 2);

    let mixed = verifier.verify_batch(&[good.clone(), "HC1:garbage".to_string()]);
    assert!(!mixed.verdict);
    assert!(mixed.outcomes[0].verdict);
    assert!(!mixed.outcomes[1].verdict);

    let empty = verifier.verify_batch::<&str>(&[]);
    assert!(!empty.verdict);
    assert!(empty.outcomes.is_empty());
}

#[test]
fn inspect_exposes_headers_signature_and_payload() {
    let sk = signing_key();
    let text = sign(&sk, &payload("v", vec![vaccine_entry(&days_ago(40), 2, 2, COMIRNATY)]));

    let diagnostics = inspect(&format!("{text}\n")).unwrap();
    assert_eq!(diagnostics.signature.len(), 64);
    assert_eq!(diagnostics.protected_headers["1"], serde_json::json!(-7));
    assert_eq!(diagnostics.protected_headers["4"], serde_json::json!("JT4aC0QQnwE="));
    assert!(diagnostics.non_base45_chars.contains(&'\n'));

    let payload = diagnostics.payload.unwrap();
    assert_eq!(payload["1"], serde_json::json!("IT"));
    assert_eq!(payload["-260"]["1"]["nam"]["fn"], serde_json::json!("Rossi"));
    assert_eq!(payload["-260"]["1"]["v"][0]["mp"], serde_json::json!(COMIRNATY));
}

#[test]
fn verifier_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Verifier>();
}
