// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Validity windows and blocklist checks.
//!
//! Every window is expressed as a pair of hour counts relative to the
//! reference time:
//! - `since`: hours elapsed past the window start (negative: not valid yet)
//! - `until`: hours left before the window end (zero or negative: expired)
//!
//! Windows that cannot be computed (missing settings, unparsable dates,
//! unknown products or test types) come out as `(0, 0)`, which classifies
//! as expired.

use chrono::{DateTime, Utc};
use greenpass_trust::{DayWindow, TrustSettings};
use tracing::debug;

use crate::certificate::{Certificate, CertificateKind};
use crate::dates::CertificateDate;
use crate::names::TestType;

const HOURS_PER_DAY: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub since: f64,
    pub until: f64,
}

impl Window {
    pub const CLOSED: Window = Window { since: 0.0, until: 0.0 };

    pub fn validity(&self) -> Validity {
        if self.since < 0.0 {
            Validity::NotYetValid
        } else if self.until <= 0.0 {
            Validity::Expired
        } else {
            Validity::Valid
        }
    }

    fn truncated(self) -> Self {
        Window {
            since: self.since.trunc(),
            until: self.until.trunc(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    NotYetValid,
    Valid,
    Expired,
}

/// What the rule engine concluded about one certificate.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    /// `None` for certificates of unknown kind.
    pub window: Option<Window>,
    /// Not yet valid counts as expired.
    pub expired: bool,
    pub blocklisted: bool,
}

#[derive(Debug, Clone)]
pub struct RuleEngine {
    settings: TrustSettings,
    reference_time: Option<DateTime<Utc>>,
    enforce_blocklist: bool,
    consider_recovery_expiration: bool,
}

impl RuleEngine {
    pub fn new(settings: TrustSettings) -> Self {
        Self {
            settings,
            reference_time: None,
            enforce_blocklist: true,
            consider_recovery_expiration: false,
        }
    }

    /// Evaluate against `at` instead of the current time.
    pub fn with_reference_time(mut self, at: DateTime<Utc>) -> Self {
        self.reference_time = Some(at);
        self
    }

    pub fn with_blocklist(mut self, enforce: bool) -> Self {
        self.enforce_blocklist = enforce;
        self
    }

    /// Also cap recovery validity at the certificate's own `du` date.
    pub fn with_recovery_expiration(mut self, consider: bool) -> Self {
        self.consider_recovery_expiration = consider;
        self
    }

    pub fn settings(&self) -> &TrustSettings {
        &self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }

    fn hours_since(&self, date: &CertificateDate) -> Option<f64> {
        let dt = date.as_datetime()?;
        Some((self.now() - dt).num_milliseconds() as f64 / 3_600_000.0)
    }

    pub fn test_remaining_time(&self, collection: &CertificateDate, test_type: &TestType) -> Window {
        let window = match test_type {
            TestType::Molecular => self.settings.tests.molecular,
            TestType::Rapid => self.settings.tests.rapid,
            TestType::Other(code) => {
                debug!(code = %code, "no window for test type");
                return Window::CLOSED;
            }
        };
        let (Some(elapsed), Some((start, end))) = (self.hours_since(collection), window.bounds()) else {
            return Window::CLOSED;
        };
        Window {
            since: elapsed - start as f64,
            until: end as f64 - elapsed,
        }
    }

    pub fn vaccine_remaining_time(&self, vaccination: &CertificateDate, product: Option<&str>, full_course: bool) -> Window {
        let Some(windows) = product.and_then(|p| self.settings.vaccine(p)) else {
            debug!(product = ?product, "no window for vaccine product");
            return Window::CLOSED;
        };
        let days = if full_course { &windows.complete } else { &windows.not_complete };
        self.day_window(vaccination, days)
    }

    pub fn recovery_remaining_time(&self, valid_from: &CertificateDate, valid_until: &CertificateDate) -> Window {
        let mut window = self.day_window(valid_from, &self.settings.recovery.default);
        if self.consider_recovery_expiration {
            match valid_until.as_datetime() {
                Some(until) => {
                    let hours_left = (until - self.now()).num_milliseconds() as f64 / 3_600_000.0;
                    window.until = window.until.min(hours_left.trunc());
                }
                None => return Window::CLOSED,
            }
        }
        window
    }

    fn day_window(&self, from: &CertificateDate, days: &DayWindow) -> Window {
        let (Some(elapsed), Some((start, end))) = (self.hours_since(from), days.bounds()) else {
            return Window::CLOSED;
        };
        Window {
            since: elapsed - start as f64 * HOURS_PER_DAY,
            until: end as f64 * HOURS_PER_DAY - elapsed,
        }
        .truncated()
    }

    pub fn is_blocklisted(&self, certificate_id: &str) -> bool {
        self.enforce_blocklist && self.settings.is_blocklisted(certificate_id)
    }

    pub fn evaluate(&self, certificate: &Certificate) -> Assessment {
        let window = match &certificate.kind {
            CertificateKind::Test(t) => Some(self.test_remaining_time(&t.collection_date, &t.test_type)),
            CertificateKind::Vaccine(v) => {
                Some(self.vaccine_remaining_time(&v.vaccination_date, v.product.as_deref(), v.full_course()))
            }
            CertificateKind::Recovery(r) => Some(self.recovery_remaining_time(&r.valid_from, &r.valid_until)),
            CertificateKind::Unknown => None,
        };
        let expired = window.is_some_and(|w| w.validity() != Validity::Valid);
        let blocklisted = certificate.certificate_id().is_some_and(|id| self.is_blocklisted(id));

        debug!(kind = certificate.kind.name(), ?window, expired, blocklisted, "rules evaluated");
        Assessment {
            window,
            expired,
            blocklisted,
        }
    }
}
