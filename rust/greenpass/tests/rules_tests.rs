// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod common;

use chrono::Duration;
use common::*;
use greenpass::{CertificateDate, TestType, Validity, Window};
use proptest::prelude::*;

proptest! {
    #[test]
    fn rapid_test_window_follows_elapsed_time(minutes in 0i64..(96 * 60)) {
        let collected = CertificateDate::Parsed(now() - Duration::minutes(minutes));
        let window = rules().test_remaining_time(&collected, &TestType::Rapid);

        let elapsed = minutes as f64 / 60.0;
        prop_assert!((window.since - elapsed).abs() < 1e-9);
        prop_assert!((window.until - (48.0 - elapsed)).abs() < 1e-9);

        let expected = if minutes < 48 * 60 { Validity::Valid } else { Validity::Expired };
        prop_assert_eq!(window.validity(), expected);
    }

    #[test]
    fn future_collection_is_not_yet_valid(minutes in 1i64..(24 * 60)) {
        let collected = CertificateDate::Parsed(now() + Duration::minutes(minutes));
        let window = rules().test_remaining_time(&collected, &TestType::Molecular);
        prop_assert_eq!(window.validity(), Validity::NotYetValid);
    }

    #[test]
    fn partial_course_window_is_whole_hours(hours in 0i64..(60 * 24)) {
        let vaccinated = CertificateDate::Parsed(now() - Duration::hours(hours));
        let window = rules().vaccine_remaining_time(&vaccinated, Some(COMIRNATY), false);

        prop_assert_eq!(window.since, (hours - 15 * 24) as f64);
        prop_assert_eq!(window.until, (42 * 24 - hours) as f64);

        let expected = if hours < 15 * 24 {
            Validity::NotYetValid
        } else if hours < 42 * 24 {
            Validity::Valid
        } else {
            Validity::Expired
        };
        prop_assert_eq!(window.validity(), expected);
    }
}

#[test]
fn unknown_inputs_close_the_window() {
    let engine = rules();
    let today = CertificateDate::Parsed(now());
    let invalid = CertificateDate::parse("not a date");

    assert_eq!(engine.test_remaining_time(&invalid, &TestType::Rapid), Window::CLOSED);
    assert_eq!(
        engine.test_remaining_time(&today, &TestType::Other("LP000".to_string())),
        Window::CLOSED
    );
    assert_eq!(engine.vaccine_remaining_time(&today, None, true), Window::CLOSED);
    assert_eq!(engine.vaccine_remaining_time(&today, Some("EU/1/99/0000"), true), Window::CLOSED);
    assert_eq!(Window::CLOSED.validity(), Validity::Expired);
}

#[test]
fn recovery_until_date_caps_the_window_when_enabled() {
    let from = CertificateDate::parse(&days_ago(10));
    let until = CertificateDate::parse(&days_ago(-5));

    let relaxed = rules().recovery_remaining_time(&from, &until);
    assert_eq!(relaxed.until, 180.0 * 24.0 - 252.0);

    let strict = rules().with_recovery_expiration(true);
    assert_eq!(strict.recovery_remaining_time(&from, &until).until, 5.0 * 24.0 - 12.0);
    assert_eq!(
        strict.recovery_remaining_time(&from, &CertificateDate::parse("")),
        Window::CLOSED
    );
}

#[test]
fn blocklist_toggle() {
    assert!(rules().is_blocklisted(BLOCKED_ID));
    assert!(!rules().is_blocklisted("URN:UVCI:01:IT:OTHER#1"));
    assert!(!rules().with_blocklist(false).is_blocklisted(BLOCKED_ID));
}
