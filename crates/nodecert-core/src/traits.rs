//! Seams between the lifecycle logic and its collaborators.
//!
//! Each trait can be implemented by a test double without touching the
//! others: a stub CA for [`CaTransport`], a temp-dir identity for
//! [`HostIdentity`], a canned verdict for [`TrustVerifier`].

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    ArtifactPresence, ArtifactRole, Certificate, KeyPair, SigningRequest, TrustContext,
    VerifiedChain, VerifyFailure,
};

/// Local credential storage for one certname.
///
/// The certname is fixed for the lifetime of the value.
pub trait HostIdentity: Send + Sync {
    /// The node's certname.
    fn certname(&self) -> &str;

    /// The private key, if one exists.
    fn key(&self) -> Result<Option<KeyPair>>;

    /// Persist a key pair (private and public halves).
    fn save_key(&self, key: &KeyPair) -> Result<()>;

    /// The locally stored CSR, if any.
    fn certificate_request(&self) -> Result<Option<SigningRequest>>;

    /// Persist the CSR that was sent to the CA.
    fn save_certificate_request(&self, csr: &SigningRequest) -> Result<()>;

    /// The host certificate on disk, if any.
    fn check_for_certificate_on_disk(&self) -> Result<Option<Certificate>>;

    /// Persist the host certificate, replacing any previous one.
    fn save_certificate(&self, cert: &Certificate) -> Result<()>;

    /// Persist the CA bundle (PEM).
    fn save_ca_bundle(&self, pem: &str) -> Result<()>;

    /// Persist the CRL (PEM).
    fn save_crl(&self, pem: &str) -> Result<()>;

    /// Load the CA bundle and CRL from disk.
    fn ssl_store(&self) -> Result<TrustContext>;

    /// Which artifacts exist right now.
    fn presence(&self) -> ArtifactPresence;

    /// Remove one artifact. Returns `false` if it did not exist.
    fn remove(&self, role: ArtifactRole) -> Result<bool>;
}

/// Remote calls to the certificate authority.
#[async_trait]
pub trait CaTransport: Send + Sync {
    /// Fetch the signed certificate for `certname`; `None` if the CA has none.
    async fn fetch_certificate(&self, certname: &str) -> Result<Option<Certificate>>;

    /// Submit a CSR for signing.
    async fn submit(&self, csr: &SigningRequest) -> Result<()>;

    /// Fetch the CA certificate bundle (PEM).
    async fn fetch_ca_bundle(&self) -> Result<String>;

    /// Fetch the CA's CRL (PEM); `None` if the CA publishes none.
    async fn fetch_crl(&self) -> Result<Option<String>>;
}

/// Validates a key/certificate pair against a trust context.
pub trait TrustVerifier: Send + Sync {
    /// Run the checks in order, stopping at the first failure.
    fn verify(
        &self,
        key: Option<&KeyPair>,
        cert: Option<&Certificate>,
        trust: &TrustContext,
    ) -> std::result::Result<VerifiedChain, VerifyFailure>;
}
