//! Settings for a nodecert run and the artifact paths they resolve to.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use nodecert_client::TransportConfig;
use nodecert_core::{ArtifactRole, CertError, Result};
use serde::{Deserialize, Serialize};

/// Settings for one invocation.
///
/// Loaded from TOML; every field has a default so an empty or missing file
/// is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// This node's certname (default: host name, lower-cased).
    pub certname: String,

    /// CA host name (default: `ca`).
    pub ca_server: String,

    /// CA port (default: 8140).
    pub ca_port: u16,

    /// Path prefix of the CA's HTTP API.
    pub api_prefix: String,

    /// Directory holding all credential artifacts.
    pub ssldir: PathBuf,

    /// The CA server's own certname. Unset means this node is not the CA.
    pub ca_certname: Option<String>,

    /// Name of the CA transport service to use.
    pub transport: String,

    /// Fetch the CRL and check revocation during verify.
    pub certificate_revocation: bool,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Per-artifact path overrides.
    pub paths: PathOverrides,
}

/// Explicit paths that take precedence over the `ssldir` layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathOverrides {
    pub private_key: Option<PathBuf>,
    pub public_key: Option<PathBuf>,
    pub certificate_request: Option<PathBuf>,
    pub certificate: Option<PathBuf>,
    pub password_file: Option<PathBuf>,
    pub ca_bundle: Option<PathBuf>,
    pub crl: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            certname: default_certname(),
            ca_server: String::from("ca"),
            ca_port: nodecert_client::DEFAULT_CA_PORT,
            api_prefix: nodecert_client::DEFAULT_API_PREFIX.to_string(),
            ssldir: default_ssldir(),
            ca_certname: None,
            transport: String::from(crate::registry::HTTP_TRANSPORT),
            certificate_revocation: true,
            timeout_secs: nodecert_client::DEFAULT_TIMEOUT.as_secs(),
            paths: PathOverrides::default(),
        }
    }
}

impl Settings {
    /// Default settings file location.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("nodecert.toml"))
    }

    /// Load settings from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| CertError::io(path, e))?;
        toml::from_str(&content).map_err(|e| {
            CertError::Configuration(format!("invalid settings file {}: {e}", path.display()))
        })
    }

    /// Reject settings no action can run with.
    pub fn validate(&self) -> Result<()> {
        if self.certname.trim().is_empty() {
            return Err(CertError::Configuration("certname must not be empty".into()));
        }
        if self.certname.contains(['/', '\\']) {
            return Err(CertError::Configuration(format!(
                "certname '{}' must not contain path separators",
                self.certname
            )));
        }
        if self.ca_server.trim().is_empty() {
            return Err(CertError::Configuration("ca_server must not be empty".into()));
        }
        if self.ca_port == 0 {
            return Err(CertError::Configuration("ca_port must not be 0".into()));
        }
        if let Some((a, b)) = ArtifactPaths::resolve(self).shared_path() {
            return Err(CertError::Configuration(format!(
                "certname '{}' puts the {} and the {} in the same file",
                self.certname,
                a.label(),
                b.label()
            )));
        }
        Ok(())
    }

    /// Transport configuration for the CA named in these settings.
    pub fn transport_config(&self) -> TransportConfig {
        let paths = ArtifactPaths::resolve(self);
        TransportConfig::new(&self.ca_server)
            .ca_port(self.ca_port)
            .api_prefix(&self.api_prefix)
            .timeout(Duration::from_secs(self.timeout_secs))
            .ca_bundle(paths.ca_bundle)
            .client_identity(paths.certificate, paths.private_key)
    }
}

/// Resolved location of every artifact for one certname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
    pub certificate_request: PathBuf,
    pub certificate: PathBuf,
    pub password_file: PathBuf,
    pub ca_bundle: PathBuf,
    pub crl: PathBuf,
}

impl ArtifactPaths {
    /// Apply overrides on top of the `ssldir` layout.
    pub fn resolve(settings: &Settings) -> Self {
        let layout = Self::in_ssldir(&settings.ssldir, &settings.certname);
        let o = &settings.paths;
        Self {
            private_key: o.private_key.clone().unwrap_or(layout.private_key),
            public_key: o.public_key.clone().unwrap_or(layout.public_key),
            certificate_request: o
                .certificate_request
                .clone()
                .unwrap_or(layout.certificate_request),
            certificate: o.certificate.clone().unwrap_or(layout.certificate),
            password_file: o.password_file.clone().unwrap_or(layout.password_file),
            ca_bundle: o.ca_bundle.clone().unwrap_or(layout.ca_bundle),
            crl: o.crl.clone().unwrap_or(layout.crl),
        }
    }

    /// Standard layout under `ssldir`.
    pub fn in_ssldir(ssldir: &Path, certname: &str) -> Self {
        let file = format!("{certname}.pem");
        Self {
            private_key: ssldir.join("private_keys").join(&file),
            public_key: ssldir.join("public_keys").join(&file),
            certificate_request: ssldir.join("certificate_requests").join(&file),
            certificate: ssldir.join("certs").join(&file),
            password_file: ssldir.join("private").join("password"),
            ca_bundle: ssldir.join("certs").join("ca.pem"),
            crl: ssldir.join("crl.pem"),
        }
    }

    /// First pair of roles that resolve to the same file, if any.
    pub fn shared_path(&self) -> Option<(ArtifactRole, ArtifactRole)> {
        ArtifactRole::ALL.iter().enumerate().find_map(|(i, &a)| {
            ArtifactRole::ALL[i + 1..]
                .iter()
                .find(|&&b| self.path(a) == self.path(b))
                .map(|&b| (a, b))
        })
    }

    /// Path of one role.
    pub fn path(&self, role: ArtifactRole) -> &Path {
        match role {
            ArtifactRole::PrivateKey => &self.private_key,
            ArtifactRole::PublicKey => &self.public_key,
            ArtifactRole::CertificateRequest => &self.certificate_request,
            ArtifactRole::Certificate => &self.certificate,
            ArtifactRole::PasswordFile => &self.password_file,
            ArtifactRole::CaBundle => &self.ca_bundle,
            ArtifactRole::Crl => &self.crl,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "nodecert", "nodecert")
}

fn default_certname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .map(|h| h.trim().to_lowercase())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| String::from("localhost"))
}

fn default_ssldir() -> PathBuf {
    project_dirs().map_or_else(|| PathBuf::from("ssl"), |dirs| dirs.data_dir().join("ssl"))
}
