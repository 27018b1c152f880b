//! Host key pair and certificate signing requests.

use std::fmt;

use rcgen::{CertificateParams, DistinguishedName, DnType};
use serde::Serialize;

use super::certificate::Certificate;
use crate::error::{CertError, Result};
use crate::hash::fingerprint;

/// The node's private/public key pair.
///
/// Generated as ECDSA P-256. The private half never leaves this type except
/// through [`KeyPair::private_key_pem`] when it is written to disk.
#[derive(Clone)]
pub struct KeyPair {
    private_pem: String,
    public_key_der: Vec<u8>,
}

impl KeyPair {
    /// Generate a fresh key pair.
    pub fn generate() -> Result<Self> {
        let key = rcgen::KeyPair::generate()?;
        Ok(Self {
            private_pem: key.serialize_pem(),
            public_key_der: key.public_key_der(),
        })
    }

    /// Load a key pair from its PEM-encoded private key.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key = rcgen::KeyPair::from_pem(pem)
            .map_err(|e| CertError::Crypto(format!("invalid private key: {e}")))?;
        Ok(Self {
            private_pem: pem.to_string(),
            public_key_der: key.public_key_der(),
        })
    }

    /// PEM-encoded private key (PKCS#8).
    #[must_use]
    pub fn private_key_pem(&self) -> &str {
        &self.private_pem
    }

    /// DER-encoded SubjectPublicKeyInfo.
    #[must_use]
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// PEM-encoded public key.
    #[must_use]
    pub fn public_key_pem(&self) -> String {
        pem::encode(&pem::Pem::new("PUBLIC KEY", self.public_key_der.clone()))
    }

    /// Whether the certificate carries exactly this public key.
    #[must_use]
    pub fn matches(&self, cert: &Certificate) -> bool {
        self.public_key_der.as_slice() == cert.public_key_der()
    }

    fn signing_key(&self) -> Result<rcgen::KeyPair> {
        rcgen::KeyPair::from_pem(&self.private_pem)
            .map_err(|e| CertError::Crypto(format!("invalid private key: {e}")))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &fingerprint(&self.public_key_der))
            .finish_non_exhaustive()
    }
}

/// A certificate signing request for the node's certname.
#[derive(Debug, Clone, Serialize)]
pub struct SigningRequest {
    /// Certname the request is for (subject CN)
    pub certname: String,
    /// SHA-256 fingerprint of the DER encoding
    pub fingerprint: String,
    #[serde(skip)]
    pem: String,
}

impl SigningRequest {
    /// Build a CSR for `certname` signed with `key`.
    pub fn build(key: &KeyPair, certname: &str) -> Result<Self> {
        if certname.is_empty() {
            return Err(CertError::Configuration("certname must not be empty".into()));
        }

        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, certname);
        params.distinguished_name = dn;

        let csr = params.serialize_request(&key.signing_key()?)?;
        Self::from_pem(certname, &csr.pem()?)
    }

    /// Wrap an existing PEM-encoded CSR.
    pub fn from_pem(certname: &str, pem: &str) -> Result<Self> {
        let block = pem::parse(pem.as_bytes())?;
        if block.tag() != "CERTIFICATE REQUEST" && block.tag() != "NEW CERTIFICATE REQUEST" {
            return Err(CertError::Crypto(format!(
                "expected a certificate request, found '{}'",
                block.tag()
            )));
        }

        Ok(Self {
            certname: certname.to_string(),
            fingerprint: fingerprint(block.contents()),
            pem: pem.to_string(),
        })
    }

    /// PEM encoding, as sent to the CA.
    #[must_use]
    pub fn pem(&self) -> &str {
        &self.pem
    }
}
