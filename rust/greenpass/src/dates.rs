// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Certificate date fields.
//!
//! Accepted forms are `YYYY-MM-DD` and `YYYY-MM-DDTHH:MM:SS[.fff][Z|+HH[:MM]|-HH[:MM]]`.
//! A value without an offset is UTC. Values that do not parse are kept
//! verbatim so that the rule engine can treat them as always expired.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateDate {
    Parsed(DateTime<Utc>),
    Invalid { raw: String },
}

impl Default for CertificateDate {
    fn default() -> Self {
        CertificateDate::Invalid { raw: String::new() }
    }
}

impl CertificateDate {
    pub fn parse(text: &str) -> Self {
        match parse_date(text) {
            Ok(dt) => CertificateDate::Parsed(dt),
            Err(e) => {
                warn!(date = text, error = %e, "unparsable certificate date");
                CertificateDate::Invalid { raw: text.to_string() }
            }
        }
    }

    /// Seconds since the Unix epoch, as used by the CWT `iat`/`exp` claims.
    pub fn from_timestamp(secs: i64) -> Self {
        match DateTime::<Utc>::from_timestamp(secs, 0) {
            Some(dt) => CertificateDate::Parsed(dt),
            None => CertificateDate::Invalid { raw: secs.to_string() },
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            CertificateDate::Parsed(dt) => Some(*dt),
            CertificateDate::Invalid { .. } => None,
        }
    }
}

impl fmt::Display for CertificateDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertificateDate::Parsed(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S UTC")),
            CertificateDate::Invalid { raw } => write!(f, "{raw} (invalid)"),
        }
    }
}

pub fn parse_date(text: &str) -> Result<DateTime<Utc>, String> {
    let text = text.trim();
    if !text.contains('T') {
        let day = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| e.to_string())?;
        return Ok(Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)));
    }

    if text.len() < 19 || !text.is_char_boundary(19) {
        return Err(format!("{text:?} is too short for a date-time"));
    }
    let (head, mut rest) = text.split_at(19);
    let mut naive = NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S").map_err(|e| e.to_string())?;

    if let Some(frac) = rest.strip_prefix('.') {
        let digits = frac.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err("empty fractional seconds".to_string());
        }
        let padded = format!("{:0<9}", &frac[..digits.min(9)]);
        let nanos: u32 = padded.parse().map_err(|_| "bad fractional seconds".to_string())?;
        naive = naive
            .with_nanosecond(nanos)
            .ok_or_else(|| "bad fractional seconds".to_string())?;
        rest = &frac[digits..];
    }

    let offset = FixedOffset::east_opt(parse_offset(rest)?).ok_or_else(|| format!("offset {rest:?} out of range"))?;
    naive
        .and_local_timezone(offset)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("{text:?} is not a valid instant"))
}

/// `""`/`Z` or `±HH`, `±HHMM`, `±HH:MM`, in seconds east of UTC.
pub(crate) fn parse_offset(text: &str) -> Result<i32, String> {
    if text.is_empty() || text == "Z" {
        return Ok(0);
    }

    let (sign, body) = match text.as_bytes()[0] {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return Err(format!("bad offset {text:?}")),
    };
    if !body.is_ascii() {
        return Err(format!("bad offset {text:?}"));
    }
    let (hh, mm) = match body.len() {
        2 => (body, "00"),
        4 => body.split_at(2),
        5 if body.as_bytes()[2] == b':' => (&body[..2], &body[3..]),
        _ => return Err(format!("bad offset {text:?}")),
    };
    if !hh.bytes().chain(mm.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(format!("bad offset {text:?}"));
    }
    let hours: i32 = hh.parse().map_err(|_| format!("bad offset {text:?}"))?;
    let minutes: i32 = mm.parse().map_err(|_| format!("bad offset {text:?}"))?;
    Ok(sign * (hours * 3600 + minutes * 60))
}
