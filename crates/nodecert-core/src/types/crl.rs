//! Certificate revocation lists.

use chrono::{DateTime, Utc};
use serde::Serialize;
use x509_parser::prelude::*;

use super::certificate::asn1_to_utc;
use crate::error::{CertError, Result};

const PEM_TAG: &str = "X509 CRL";

/// A parsed CRL, as published by the CA.
#[derive(Debug, Clone, Serialize)]
pub struct RevocationList {
    /// Issuer distinguished name (human-readable)
    pub issuer: String,
    /// When this list was issued
    pub last_update: DateTime<Utc>,
    /// When the next list is due, if stated
    pub next_update: Option<DateTime<Utc>>,
    /// Number of revoked serials
    pub revoked_count: usize,
    #[serde(skip)]
    der: Vec<u8>,
    #[serde(skip)]
    issuer_raw: Vec<u8>,
    #[serde(skip)]
    revoked: Vec<Vec<u8>>,
}

impl RevocationList {
    /// Parse a DER-encoded CRL.
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let parsed = {
            let (_, crl) = parse_x509_crl(&der)
                .map_err(|e| CertError::Crypto(format!("invalid CRL: {e}")))?;

            let revoked: Vec<Vec<u8>> = crl
                .iter_revoked_certificates()
                .map(|r| r.user_certificate.to_bytes_be())
                .collect();

            Self {
                issuer: crl.issuer().to_string(),
                last_update: asn1_to_utc(crl.last_update()),
                next_update: crl.next_update().map(asn1_to_utc),
                revoked_count: revoked.len(),
                issuer_raw: crl.issuer().as_raw().to_vec(),
                revoked,
                der: Vec::new(),
            }
        };

        Ok(Self { der, ..parsed })
    }

    /// Parse every CRL in a PEM document.
    pub fn parse_many(pem: &str) -> Result<Vec<Self>> {
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

    /// Raw DER of the issuer name.
    #[must_use]
    pub fn issuer_raw(&self) -> &[u8] {
        &self.issuer_raw
    }

    /// Whether the serial (big-endian, no leading zeros) is listed.
    #[must_use]
    pub fn is_revoked(&self, serial: &[u8]) -> bool {
        self.revoked.iter().any(|s| s == serial)
    }

    /// Whether the list is past its next-update time.
    #[must_use]
    pub fn is_stale_at(&self, at: DateTime<Utc>) -> bool {
        self.next_update.is_some_and(|next| at > next)
    }
}
