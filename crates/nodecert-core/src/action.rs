//! Lifecycle actions.

use std::fmt;

use crate::error::{CertError, Result};

/// The four lifecycle actions plus the read-only `status` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Generate a key if needed and submit a CSR to the CA
    SubmitRequest,
    /// Fetch the signed certificate from the CA
    DownloadCert,
    /// Check the local key/certificate pair against the trust store
    Verify,
    /// Remove local credential artifacts
    Clean,
    /// Report the lifecycle stage derived from local artifacts
    Status,
}

impl Action {
    /// All actions accepted on the command line.
    pub const ALL: [Self; 5] = [
        Self::SubmitRequest,
        Self::DownloadCert,
        Self::Verify,
        Self::Clean,
        Self::Status,
    ];

    /// Name used on the command line.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitRequest => "submit_request",
            Self::DownloadCert => "download_cert",
            Self::Verify => "verify",
            Self::Clean => "clean",
            Self::Status => "status",
        }
    }

    /// Short description used in error messages ("could not <describe> ...").
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::SubmitRequest => "submit certificate request",
            Self::DownloadCert => "download certificate",
            Self::Verify => "verify certificate",
            Self::Clean => "clean credentials",
            Self::Status => "determine status",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = CertError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s || a.as_str().replace('_', "-") == s)
            .ok_or_else(|| CertError::UnknownAction(s.to_string()))
    }
}
