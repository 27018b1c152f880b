//! File-backed host identity.
//!
//! Each artifact lives at the path given by [`ArtifactPaths`]. Parent
//! directories are created on first write; the private key and password
//! file are written with mode 0600 on Unix.

use std::io::ErrorKind;
use std::path::Path;

use nodecert_core::{
    ArtifactPresence, ArtifactRole, CertError, Certificate, HostIdentity, KeyPair, Result,
    SigningRequest, TrustContext,
};
use tracing::{debug, info};

use crate::settings::{ArtifactPaths, Settings};

/// Credentials for one certname, stored as PEM files.
#[derive(Debug, Clone)]
pub struct FileHostIdentity {
    certname: String,
    paths: ArtifactPaths,
}

impl FileHostIdentity {
    /// Create an identity rooted at explicit paths.
    pub fn new(certname: impl Into<String>, paths: ArtifactPaths) -> Self {
        Self {
            certname: certname.into(),
            paths,
        }
    }

    /// Create an identity from settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.certname, ArtifactPaths::resolve(settings))
    }

    /// Where each artifact is stored.
    pub const fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    fn read(&self, role: ArtifactRole) -> Result<Option<String>> {
        read_optional(self.paths.path(role))
    }

    fn write(&self, role: ArtifactRole, contents: &str) -> Result<()> {
        let private = matches!(role, ArtifactRole::PrivateKey | ArtifactRole::PasswordFile);
        write_file(self.paths.path(role), contents, private)?;
        debug!(role = %role, path = %self.paths.path(role).display(), "artifact written");
        Ok(())
    }
}

impl HostIdentity for FileHostIdentity {
    fn certname(&self) -> &str {
        &self.certname
    }

    fn key(&self) -> Result<Option<KeyPair>> {
        self.read(ArtifactRole::PrivateKey)?
            .map(|pem| KeyPair::from_pem(&pem))
            .transpose()
    }

    fn save_key(&self, key: &KeyPair) -> Result<()> {
        self.write(ArtifactRole::PrivateKey, key.private_key_pem())?;
        self.write(ArtifactRole::PublicKey, &key.public_key_pem())
    }

    fn certificate_request(&self) -> Result<Option<SigningRequest>> {
        self.read(ArtifactRole::CertificateRequest)?
            .map(|pem| SigningRequest::from_pem(&self.certname, &pem))
            .transpose()
    }

    fn save_certificate_request(&self, csr: &SigningRequest) -> Result<()> {
        self.write(ArtifactRole::CertificateRequest, csr.pem())
    }

    fn check_for_certificate_on_disk(&self) -> Result<Option<Certificate>> {
        self.read(ArtifactRole::Certificate)?
            .map(|pem| Certificate::from_pem(&pem))
            .transpose()
    }

    fn save_certificate(&self, cert: &Certificate) -> Result<()> {
        self.write(ArtifactRole::Certificate, &cert.to_pem())
    }

    fn save_ca_bundle(&self, pem: &str) -> Result<()> {
        self.write(ArtifactRole::CaBundle, pem)
    }

    fn save_crl(&self, pem: &str) -> Result<()> {
        self.write(ArtifactRole::Crl, pem)
    }

    fn ssl_store(&self) -> Result<TrustContext> {
        let path = self.paths.path(ArtifactRole::CaBundle);
        let bundle = read_optional(path)?.ok_or_else(|| {
            CertError::io(path, std::io::Error::new(ErrorKind::NotFound, "CA bundle not found"))
        })?;
        let crl = self.read(ArtifactRole::Crl)?;
        TrustContext::from_pem(&bundle, crl.as_deref())
    }

    fn presence(&self) -> ArtifactPresence {
        ArtifactPresence::from_fn(|role| self.paths.path(role).is_file())
    }

    fn remove(&self, role: ArtifactRole) -> Result<bool> {
        let path = self.paths.path(role);
        match std::fs::remove_file(path) {
            Ok(()) => {
                info!(role = %role, path = %path.display(), "removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CertError::io(path, e)),
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CertError::io(path, e)),
    }
}

fn write_file(path: &Path, contents: &str, private: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CertError::io(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| CertError::io(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if private {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| CertError::io(path, e))?;
        }
    }
    #[cfg(not(unix))]
    let _ = private;

    Ok(())
}
