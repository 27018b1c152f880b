use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::action::Action;

/// Result type alias for certificate lifecycle operations
pub type Result<T> = std::result::Result<T, CertError>;

/// Boxed cause carried by wrapping variants
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Discriminant of a [`CertError`], for callers that branch on the kind of
/// failure rather than its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Transport,
    AlreadySubmitted,
    KeyMismatch,
    MissingKey,
    MissingCertificate,
    KeyCertMismatch,
    ChainInvalid,
    Revoked,
    UnsafeOperation,
    FileSystem,
    UnknownAction,
    UnknownService,
    Crypto,
}

/// Errors that can occur while managing the node's credentials
#[derive(Error, Debug)]
pub enum CertError {
    /// Missing or invalid settings
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The CA could not be reached or answered with a non-success status
    #[error("CA request failed: {message}")]
    Transport {
        /// What went wrong
        message: String,
        /// HTTP status, when the CA answered
        status: Option<u16>,
        /// Underlying transport failure
        #[source]
        source: Option<BoxError>,
    },

    /// A CSR for this certname is already pending on the CA
    #[error("a certificate request for '{certname}' is already pending on the CA")]
    AlreadySubmitted {
        /// Certname of the pending request
        certname: String,
    },

    /// The CA holds a certificate whose public key is not the local key
    #[error(
        "the certificate the CA holds for '{certname}' does not match the local private key; \
         the key was rotated without cleaning, or the CA state is stale"
    )]
    KeyMismatch {
        /// Certname whose certificate was rejected
        certname: String,
    },

    /// No private key on disk
    #[error("no private key found for '{certname}'")]
    MissingKey {
        /// Certname that has no key
        certname: String,
    },

    /// No certificate on disk
    #[error("no certificate found for '{certname}'")]
    MissingCertificate {
        /// Certname that has no certificate
        certname: String,
    },

    /// The local certificate's public key does not match the local private key
    #[error("the certificate for '{certname}' does not match its private key")]
    KeyCertMismatch {
        /// Certname whose pair is inconsistent
        certname: String,
    },

    /// Chain validation against the CA bundle failed
    #[error("certificate chain validation failed ({code}): {message}")]
    ChainInvalid {
        /// Validator error code
        code: i32,
        /// Human readable reason
        message: String,
    },

    /// The certificate appears on the CA's revocation list
    #[error("certificate with serial {serial} has been revoked")]
    Revoked {
        /// Serial number (hex)
        serial: String,
    },

    /// Refused a destructive action that would desynchronize the node from the CA
    #[error(
        "the CA still holds a certificate for '{certname}' (serial {serial}, \
         fingerprint {fingerprint}, valid until {}); revoke and clean '{certname}' \
         on the CA server first, then clean locally",
        .not_after.format("%Y-%m-%d %H:%M:%S UTC")
    )]
    UnsafeOperation {
        /// Certname that would have been cleaned
        certname: String,
        /// Fingerprint of the certificate the CA holds
        fingerprint: String,
        /// Serial number (hex) of the certificate the CA holds
        serial: String,
        /// Expiry of the certificate the CA holds
        not_after: DateTime<Utc>,
    },

    /// Reading, writing or removing an artifact failed
    #[error("filesystem error on {}: {source}", path.display())]
    FileSystem {
        /// Artifact path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The requested action does not exist
    #[error("unknown action '{0}' (expected one of: submit_request, download_cert, verify, clean, status)")]
    UnknownAction(String),

    /// No service is registered under this name
    #[error("unknown service: {0}")]
    UnknownService(String),

    /// PEM/DER decoding or key handling failed
    #[error("crypto error: {0}")]
    Crypto(String),

    /// An action failed; carries the original cause
    #[error("could not {} for '{certname}': {source}", action.describe())]
    Action {
        /// The action that failed
        action: Action,
        /// Certname the action ran for
        certname: String,
        /// Original failure
        #[source]
        source: Box<CertError>,
    },
}

impl CertError {
    /// Build a filesystem error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }

    /// Build a transport error without an HTTP status.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Wrap this error as the cause of a failed action.
    ///
    /// Wrapping an error that already belongs to an action is a no-op.
    #[must_use]
    pub fn in_action(self, action: Action, certname: &str) -> Self {
        match self {
            Self::Action { .. } => self,
            other => Self::Action {
                action,
                certname: certname.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The kind of the root failure, looking through action wrappers.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::AlreadySubmitted { .. } => ErrorKind::AlreadySubmitted,
            Self::KeyMismatch { .. } => ErrorKind::KeyMismatch,
            Self::MissingKey { .. } => ErrorKind::MissingKey,
            Self::MissingCertificate { .. } => ErrorKind::MissingCertificate,
            Self::KeyCertMismatch { .. } => ErrorKind::KeyCertMismatch,
            Self::ChainInvalid { .. } => ErrorKind::ChainInvalid,
            Self::Revoked { .. } => ErrorKind::Revoked,
            Self::UnsafeOperation { .. } => ErrorKind::UnsafeOperation,
            Self::FileSystem { .. } => ErrorKind::FileSystem,
            Self::UnknownAction(_) => ErrorKind::UnknownAction,
            Self::UnknownService(_) => ErrorKind::UnknownService,
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::Action { source, .. } => source.kind(),
        }
    }

    /// Returns true if running the action again may succeed without
    /// operator intervention
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status, .. } => status.map_or(true, |s| s >= 500),
            Self::Action { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns the HTTP status code if the CA answered
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            Self::Action { source, .. } => source.status_code(),
            _ => None,
        }
    }
}

impl From<pem::PemError> for CertError {
    fn from(e: pem::PemError) -> Self {
        Self::Crypto(format!("invalid PEM: {e}"))
    }
}

impl From<rcgen::Error> for CertError {
    fn from(e: rcgen::Error) -> Self {
        Self::Crypto(e.to_string())
    }
}
