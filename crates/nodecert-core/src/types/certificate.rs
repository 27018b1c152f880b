//! X.509 certificates as seen by the node.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use x509_parser::prelude::*;

use crate::error::{CertError, Result};
use crate::hash::fingerprint;

const PEM_TAG: &str = "CERTIFICATE";

/// A parsed X.509 certificate.
///
/// Owns its DER encoding; the fields below are extracted once at parse time.
#[derive(Debug, Clone, Serialize)]
pub struct Certificate {
    /// Subject common name (the certname for host certificates)
    pub common_name: Option<String>,
    /// Subject distinguished name (human-readable)
    pub subject: String,
    /// Issuer distinguished name (human-readable)
    pub issuer: String,
    /// Serial number (hex, colon separated)
    pub serial: String,
    /// Not valid before
    pub not_before: DateTime<Utc>,
    /// Not valid after
    pub not_after: DateTime<Utc>,
    /// SHA-256 fingerprint of the DER encoding
    pub fingerprint: String,
    #[serde(skip)]
    der: Vec<u8>,
    #[serde(skip)]
    subject_raw: Vec<u8>,
    #[serde(skip)]
    issuer_raw: Vec<u8>,
    #[serde(skip)]
    serial_bytes: Vec<u8>,
    #[serde(skip)]
    public_key_der: Vec<u8>,
}

impl Certificate {
    /// Parse a single DER-encoded certificate.
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(&der)
            .map_err(|e| CertError::Crypto(format!("invalid certificate: {e}")))?;

        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(String::from);

        let parsed = Self {
            common_name,
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial: cert.raw_serial_as_string(),
            not_before: asn1_to_utc(cert.validity().not_before),
            not_after: asn1_to_utc(cert.validity().not_after),
            fingerprint: fingerprint(&der),
            subject_raw: cert.subject().as_raw().to_vec(),
            issuer_raw: cert.issuer().as_raw().to_vec(),
            serial_bytes: cert.tbs_certificate.serial.to_bytes_be(),
            public_key_der: cert.public_key().raw.to_vec(),
            der: Vec::new(),
        };

        Ok(Self { der, ..parsed })
    }

    /// Parse the first certificate in a PEM document.
    pub fn from_pem(pem: &str) -> Result<Self> {
        Self::parse_bundle(pem)?
            .into_iter()
            .next()
            .ok_or_else(|| CertError::Crypto("no certificate found in PEM data".into()))
    }

    /// Parse every certificate in a PEM bundle, in order.
    ///
    /// Blocks with other tags are ignored.
    pub fn parse_bundle(pem: &str) -> Result<Vec<Self>> {
        ::pem::parse_many(pem.as_bytes())?
            .into_iter()
            .filter(|p| p.tag() == PEM_TAG)
            .map(|p| Self::from_der(p.into_contents()))
            .collect()
    }

    /// DER encoding.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// PEM encoding.
    #[must_use]
    pub fn to_pem(&self) -> String {
        ::pem::encode(&::pem::Pem::new(PEM_TAG, self.der.clone()))
    }

    /// DER-encoded SubjectPublicKeyInfo.
    #[must_use]
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Raw DER of the subject name.
    #[must_use]
    pub fn subject_raw(&self) -> &[u8] {
        &self.subject_raw
    }

    /// Raw DER of the issuer name.
    #[must_use]
    pub fn issuer_raw(&self) -> &[u8] {
        &self.issuer_raw
    }

    /// Big-endian serial number without leading zero bytes.
    #[must_use]
    pub fn serial_bytes(&self) -> &[u8] {
        &self.serial_bytes
    }

    /// Whether subject and issuer are the same name.
    #[must_use]
    pub fn is_self_issued(&self) -> bool {
        self.subject_raw == self.issuer_raw
    }

    /// Whether `at` falls inside the validity window.
    #[must_use]
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

/// Convert an ASN.1 `GeneralizedTime` / `UTCTime` to `DateTime<Utc>`.
pub(crate) fn asn1_to_utc(t: ASN1Time) -> DateTime<Utc> {
    Utc.timestamp_opt(t.timestamp(), 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
