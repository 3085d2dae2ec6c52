// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! CBOR payload -> [`Certificate`].

use greenpass_common::{CborKey, CborMap, CborValue, CoseMessage};
use tracing::{debug, warn};

use crate::certificate::{
    Certificate, CertificateKind, EntryInfo, PersonalInfo, QrInfo, RecoveryEntry, TestEntry, TestResult,
    VaccineEntry,
};
use crate::dates::CertificateDate;
use crate::error::CertificateError;
use crate::names::TestType;

pub mod labels {
    pub const ISSUING_COUNTRY: i64 = 1;
    pub const EXPIRATION_DATE: i64 = 4;
    pub const RELEASE_DATE: i64 = 6;
    pub const HEALTH_CERTIFICATE: i64 = -260;
    pub const EU_DCC: i64 = 1;

    pub const VERSION: &str = "ver";
    pub const DATE_OF_BIRTH: &str = "dob";
    pub const NAME: &str = "nam";
    pub const FIRST_NAME: &str = "gn";
    pub const LAST_NAME: &str = "fn";

    pub const VACCINE: &str = "v";
    pub const TEST: &str = "t";
    pub const RECOVERY: &str = "r";

    pub const TARGET_DISEASE: &str = "tg";
    pub const COUNTRY: &str = "co";
    pub const ISSUER: &str = "is";
    pub const CERTIFICATE_ID: &str = "ci";

    pub const FIRST_POSITIVE_TEST: &str = "fr";
    pub const VALID_FROM: &str = "df";
    pub const VALID_UNTIL: &str = "du";

    pub const MANUFACTURER: &str = "ma";
    pub const TEST_TYPE: &str = "tt";
    pub const TEST_NAME: &str = "tn";
    pub const COLLECTION_DATE: &str = "sc";
    pub const TEST_RESULT: &str = "tr";
    pub const TESTING_CENTER: &str = "tc";

    pub const DOSE_NUMBER: &str = "dn";
    pub const TOTAL_DOSES: &str = "sd";
    pub const PRODUCT: &str = "mp";
    pub const VACCINE_TYPE: &str = "vp";
    pub const VACCINATION_DATE: &str = "dt";
}

fn unrecognized(what: &str) -> CertificateError {
    CertificateError::Unrecognized(what.to_string())
}

fn text_field(map: &CborMap, key: &str) -> Option<String> {
    match map.get(&CborKey::from(key))? {
        CborValue::Text(s) => Some(s.clone()),
        CborValue::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

fn int_field(map: &CborMap, key: &str) -> i64 {
    match map.get(&CborKey::from(key)) {
        Some(CborValue::Int(i)) => *i,
        Some(CborValue::Float(f)) => *f as i64,
        Some(CborValue::Text(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn timestamp_field(map: &CborMap, label: i64) -> Option<CertificateDate> {
    match map.get(&CborKey::Int(label))? {
        CborValue::Int(i) => Some(CertificateDate::from_timestamp(*i)),
        CborValue::Float(f) => Some(CertificateDate::from_timestamp(*f as i64)),
        _ => None,
    }
}

fn qr_info(payload: &CborMap) -> Result<QrInfo, CertificateError> {
    let issuing_country = match payload.get(&CborKey::Int(labels::ISSUING_COUNTRY)) {
        Some(CborValue::Text(s)) => s.clone(),
        _ => return Err(unrecognized("missing issuing country")),
    };
    Ok(QrInfo {
        issuing_country,
        release_date: timestamp_field(payload, labels::RELEASE_DATE)
            .ok_or_else(|| unrecognized("missing release date"))?,
        expiration_date: timestamp_field(payload, labels::EXPIRATION_DATE)
            .ok_or_else(|| unrecognized("missing expiration date"))?,
    })
}

fn personal_info(hcert: &CborMap) -> Result<PersonalInfo, CertificateError> {
    let name = hcert
        .get(&CborKey::from(labels::NAME))
        .and_then(CborValue::as_map)
        .ok_or_else(|| unrecognized("missing name"))?;
    Ok(PersonalInfo {
        schema_version: text_field(hcert, labels::VERSION).ok_or_else(|| unrecognized("missing version"))?,
        date_of_birth: text_field(hcert, labels::DATE_OF_BIRTH)
            .ok_or_else(|| unrecognized("missing date of birth"))?,
        first_name: text_field(name, labels::FIRST_NAME).ok_or_else(|| unrecognized("missing given name"))?,
        last_name: text_field(name, labels::LAST_NAME).ok_or_else(|| unrecognized("missing family name"))?,
    })
}

/// Pick the entry kind from the fields present. Later kinds win when an
/// entry carries the required fields of several.
fn classify(entry: &CborMap) -> CertificateKind {
    let info = EntryInfo {
        target_disease: text_field(entry, labels::TARGET_DISEASE).unwrap_or_default(),
        country: text_field(entry, labels::COUNTRY).unwrap_or_default(),
        issuer: text_field(entry, labels::ISSUER).unwrap_or_default(),
        certificate_id: text_field(entry, labels::CERTIFICATE_ID).unwrap_or_default(),
    };
    let date = |key: &str| text_field(entry, key).map(|s| CertificateDate::parse(&s));

    if let (Some(valid_from), Some(valid_until)) = (date(labels::VALID_FROM), date(labels::VALID_UNTIL)) {
        return CertificateKind::Recovery(RecoveryEntry {
            info,
            valid_from,
            valid_until,
            first_positive_test: text_field(entry, labels::FIRST_POSITIVE_TEST),
        });
    }

    if let (Some(collection_date), Some(test_type)) =
        (date(labels::COLLECTION_DATE), text_field(entry, labels::TEST_TYPE))
    {
        return CertificateKind::Test(TestEntry {
            info,
            test_type: TestType::from_code(&test_type),
            collection_date,
            result: text_field(entry, labels::TEST_RESULT).map(|c| TestResult::from_code(&c)),
            test_name: text_field(entry, labels::TEST_NAME),
            manufacturer: text_field(entry, labels::MANUFACTURER),
            testing_center: text_field(entry, labels::TESTING_CENTER),
        });
    }

    if let (Some(vaccine_type), Some(vaccination_date)) =
        (text_field(entry, labels::VACCINE_TYPE), date(labels::VACCINATION_DATE))
    {
        return CertificateKind::Vaccine(VaccineEntry {
            info,
            vaccine_type,
            vaccination_date,
            product: text_field(entry, labels::PRODUCT),
            manufacturer: text_field(entry, labels::MANUFACTURER),
            dose_number: int_field(entry, labels::DOSE_NUMBER),
            total_doses: int_field(entry, labels::TOTAL_DOSES),
        });
    }

    CertificateKind::Unknown
}

/// Map a decoded CWT payload to a certificate.
///
/// The entry array is taken from `v`, else `t`, else `r`. Anything other than
/// exactly one entry yields [`CertificateKind::Unknown`].
pub fn map_payload(payload: &CborValue) -> Result<Certificate, CertificateError> {
    let payload = payload.as_map().ok_or_else(|| unrecognized("payload is not a map"))?;
    let qr_info = qr_info(payload)?;

    let hcert = payload
        .get(&CborKey::Int(labels::HEALTH_CERTIFICATE))
        .and_then(|hc| hc.get(labels::EU_DCC))
        .and_then(CborValue::as_map)
        .ok_or_else(|| unrecognized("missing health certificate claim"))?;
    let personal_info = personal_info(hcert)?;

    let entries = [labels::VACCINE, labels::TEST, labels::RECOVERY]
        .into_iter()
        .find_map(|key| match hcert.get(&CborKey::from(key)) {
            None | Some(CborValue::Null) => None,
            Some(v) => Some(v),
        })
        .ok_or_else(|| unrecognized("no vaccine, test or recovery entries"))?;

    let kind = match entries.as_array() {
        Some([entry]) => match entry.as_map() {
            Some(map) => classify(map),
            None => {
                warn!("certificate entry is not a map");
                CertificateKind::Unknown
            }
        },
        Some(list) => {
            warn!(entries = list.len(), "expected exactly one certificate entry");
            CertificateKind::Unknown
        }
        None => {
            warn!("certificate entries are not an array");
            CertificateKind::Unknown
        }
    };

    debug!(kind = kind.name(), "payload mapped");
    Ok(Certificate::new(qr_info, personal_info, kind))
}

/// Map the payload of `message` and carry over its key id and algorithm.
pub fn map_message(message: &CoseMessage, payload: &CborValue) -> Result<Certificate, CertificateError> {
    let mut certificate = map_payload(payload)?;
    certificate.key_id = message.key_id().map(<[u8]>::to_vec);
    certificate.signature_algorithm = message.algorithm();
    Ok(certificate)
}

/// Key id from the protected headers, else the unprotected ones.
pub fn key_id(message: &CoseMessage) -> Result<&[u8], CertificateError> {
    message.key_id().ok_or(CertificateError::KeyIdNotFound)
}
