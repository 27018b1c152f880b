//! Trust context and verification outcomes.

use serde::Serialize;

use super::certificate::Certificate;
use super::crl::RevocationList;
use crate::error::{CertError, Result};

/// The CA bundle and CRLs a certificate is validated against.
///
/// Read from local storage and never mutated by the lifecycle code.
#[derive(Debug, Clone, Default)]
pub struct TrustContext {
    /// Trust anchors and intermediates, in bundle order
    pub ca_bundle: Vec<Certificate>,
    /// Revocation lists
    pub crls: Vec<RevocationList>,
    /// Every issuer on the path must have a CRL here
    pub require_crl: bool,
}

impl TrustContext {
    /// Build a trust context from PEM text.
    pub fn from_pem(ca_bundle: &str, crl: Option<&str>) -> Result<Self> {
        let ca_bundle = Certificate::parse_bundle(ca_bundle)?;
        if ca_bundle.is_empty() {
            return Err(CertError::Crypto("CA bundle contains no certificates".into()));
        }
        let crls = match crl {
            Some(pem) => RevocationList::parse_many(pem)?,
            None => Vec::new(),
        };
        Ok(Self {
            ca_bundle,
            require_crl: !crls.is_empty(),
            crls,
        })
    }

    /// Turn revocation checking on or off.
    ///
    /// On, a missing CRL fails verification instead of skipping the check.
    #[must_use]
    pub fn revocation(mut self, enabled: bool) -> Self {
        if !enabled {
            self.crls.clear();
        }
        self.require_crl = enabled;
        self
    }

    /// Whether revocation will be evaluated.
    #[must_use]
    pub fn checks_revocation(&self) -> bool {
        self.require_crl || !self.crls.is_empty()
    }
}

/// Why a key/certificate pair failed verification.
///
/// Checks run in the order of the variants and stop at the first failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyFailure {
    /// No private key
    MissingKey,
    /// No certificate
    MissingCertificate,
    /// Certificate public key differs from the private key's
    KeyCertMismatch,
    /// Chain validation failed
    ChainInvalid {
        /// Validator error code
        code: i32,
        /// Human readable reason
        message: String,
    },
    /// The certificate is on a CRL
    Revoked {
        /// Serial number (hex)
        serial: String,
    },
}

impl VerifyFailure {
    /// Turn the failure into an error about `certname`.
    #[must_use]
    pub fn into_error(self, certname: &str) -> CertError {
        let certname = certname.to_string();
        match self {
            Self::MissingKey => CertError::MissingKey { certname },
            Self::MissingCertificate => CertError::MissingCertificate { certname },
            Self::KeyCertMismatch => CertError::KeyCertMismatch { certname },
            Self::ChainInvalid { code, message } => CertError::ChainInvalid { code, message },
            Self::Revoked { serial } => CertError::Revoked { serial },
        }
    }
}

/// One certificate on a validated path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainLink {
    /// Subject distinguished name
    pub subject: String,
    /// SHA-256 fingerprint
    pub fingerprint: String,
}

impl From<&Certificate> for ChainLink {
    fn from(cert: &Certificate) -> Self {
        Self {
            subject: cert.subject.clone(),
            fingerprint: cert.fingerprint.clone(),
        }
    }
}

/// A successful verification: the leaf first, the trust anchor last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedChain {
    /// Path from the host certificate to its trust anchor
    pub links: Vec<ChainLink>,
    /// Whether a CRL was consulted
    pub revocation_checked: bool,
}
