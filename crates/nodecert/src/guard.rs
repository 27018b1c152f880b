//! Veto for destructive local actions.
//!
//! Cleaning the CA server's own credentials while the CA still holds a
//! certificate for it leaves the two sides out of sync: the next submit
//! would be rejected and the server could no longer authenticate. The
//! guard refuses that one case and allows everything else.

use chrono::{DateTime, Utc};
use nodecert_core::{CaTransport, CertError, Result};
use serde::Serialize;
use tracing::{debug, warn};

/// The certificate the CA still holds for a certname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeldCertificate {
    pub certname: String,
    pub fingerprint: String,
    pub serial: String,
    pub not_after: DateTime<Utc>,
}

/// Decision on whether local artifacts may be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanVerdict {
    Allow,
    Deny(HeldCertificate),
}

impl CleanVerdict {
    /// Turn a denial into the error reported to the operator.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(held) => Err(CertError::UnsafeOperation {
                certname: held.certname,
                fingerprint: held.fingerprint,
                serial: held.serial,
                not_after: held.not_after,
            }),
        }
    }
}

/// Decides whether a clean is safe for a given certname.
#[derive(Debug, Clone, Default)]
pub struct SafetyGuard {
    ca_certname: Option<String>,
}

impl SafetyGuard {
    /// `ca_certname` is the CA server's own certname, if known.
    pub fn new(ca_certname: Option<String>) -> Self {
        Self {
            ca_certname: ca_certname.filter(|name| !name.is_empty()),
        }
    }

    /// Whether `certname` is the CA server's own certname.
    pub fn is_ca_server(&self, certname: &str) -> bool {
        self.ca_certname.as_deref() == Some(certname)
    }

    /// Decide whether `certname`'s local artifacts may be removed.
    ///
    /// Only consults the CA when `certname` is the CA server's. Transport
    /// errors propagate; an unreachable CA never counts as "no certificate".
    pub async fn may_clean(
        &self,
        certname: &str,
        transport: &dyn CaTransport,
    ) -> Result<CleanVerdict> {
        if !self.is_ca_server(certname) {
            return Ok(CleanVerdict::Allow);
        }

        debug!(certname, "certname is the CA server's, checking for a held certificate");
        match transport.fetch_certificate(certname).await? {
            None => Ok(CleanVerdict::Allow),
            Some(cert) => {
                warn!(
                    certname,
                    fingerprint = %cert.fingerprint,
                    "refusing to clean: the CA still holds a certificate"
                );
                Ok(CleanVerdict::Deny(HeldCertificate {
                    certname: certname.to_string(),
                    fingerprint: cert.fingerprint,
                    serial: cert.serial,
                    not_after: cert.not_after,
                }))
            }
        }
    }
}
