//! Transport configuration types.

use std::path::PathBuf;
use std::time::Duration;

/// Default CA port
pub const DEFAULT_CA_PORT: u16 = 8140;

/// Default path prefix of the CA's HTTP API
pub const DEFAULT_API_PREFIX: &str = "/puppet-ca/v1";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the CA lives and how to talk to it
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// CA host name
    pub ca_server: String,

    /// CA port
    pub ca_port: u16,

    /// Path prefix of the CA API
    pub api_prefix: String,

    /// Request timeout
    pub timeout: Duration,

    /// Local CA bundle used to verify the CA's TLS certificate.
    ///
    /// While the file does not exist the transport is bootstrapping and
    /// only the CA bundle itself may be fetched unverified.
    pub ca_bundle: Option<PathBuf>,

    /// Host certificate and private key presented for client auth, when both exist
    pub client_identity: Option<(PathBuf, PathBuf)>,
}

impl TransportConfig {
    /// Create a configuration for the given CA host with default port and prefix
    #[must_use]
    pub fn new(ca_server: impl Into<String>) -> Self {
        Self {
            ca_server: ca_server.into(),
            ca_port: DEFAULT_CA_PORT,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            timeout: DEFAULT_TIMEOUT,
            ca_bundle: None,
            client_identity: None,
        }
    }

    /// Set the CA port
    #[must_use]
    pub const fn ca_port(mut self, port: u16) -> Self {
        self.ca_port = port;
        self
    }

    /// Set the API path prefix
    #[must_use]
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the local CA bundle path
    #[must_use]
    pub fn ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_bundle = Some(path.into());
        self
    }

    /// Set the client certificate and key paths
    #[must_use]
    pub fn client_identity(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.client_identity = Some((cert.into(), key.into()));
        self
    }

    /// Base URL of the CA API, without trailing slash
    #[must_use]
    pub fn base_url(&self) -> String {
        format!(
            "https://{}:{}/{}",
            self.ca_server,
            self.ca_port,
            self.api_prefix.trim_matches('/')
        )
    }
}
