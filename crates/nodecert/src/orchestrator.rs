//! The user-facing actions.
//!
//! An [`Orchestrator`] is bound to one certname (through its
//! [`HostIdentity`]) and runs one action at a time. Every failure leaves
//! the action as a [`CertError::Action`] carrying the original cause.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use nodecert_core::{
    Action, ArtifactRole, CaTransport, CertError, Certificate, HostIdentity, KeyPair,
    LifecycleStage, RevocationList, Result, SigningRequest, TrustVerifier, VerifiedChain,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::guard::SafetyGuard;
use crate::identity::FileHostIdentity;
use crate::registry::Services;
use crate::settings::Settings;
use crate::verifier::ChainVerifier;

/// A submitted request and the download attempt that followed it.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub request: SigningRequest,
    /// A new private key was generated for this request
    pub key_generated: bool,
    pub download: DownloadOutcome,
}

/// Result of asking the CA for the signed certificate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadOutcome {
    /// The CA has not signed the request yet
    NotReady,
    /// The certificate matched the local key and was saved
    Saved(Certificate),
}

/// A verified host certificate.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub certname: String,
    pub fingerprint: String,
    pub not_after: DateTime<Utc>,
    pub chain: VerifiedChain,
}

/// What a clean removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub certname: String,
    pub removed: Vec<ArtifactRole>,
    /// Roles in the clean set that were already absent
    pub absent: Vec<ArtifactRole>,
}

/// Local artifacts and the stage they imply.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub certname: String,
    pub stage: LifecycleStage,
    pub present: Vec<ArtifactRole>,
    pub certificate: Option<Certificate>,
}

/// Sequences the lifecycle actions over a host identity and a CA.
pub struct Orchestrator {
    identity: Arc<dyn HostIdentity>,
    transport: Arc<dyn CaTransport>,
    verifier: Arc<dyn TrustVerifier>,
    guard: SafetyGuard,
    check_revocation: bool,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("certname", &self.identity.certname())
            .field("guard", &self.guard)
            .field("check_revocation", &self.check_revocation)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator with the default verifier and a guard that
    /// does not know the CA server's certname.
    pub fn new(identity: Arc<dyn HostIdentity>, transport: Arc<dyn CaTransport>) -> Self {
        Self {
            identity,
            transport,
            verifier: Arc::new(ChainVerifier::new()),
            guard: SafetyGuard::default(),
            check_revocation: true,
        }
    }

    /// Wire an orchestrator from settings, taking the transport from `services`.
    pub fn from_settings(settings: &Settings, services: &Services) -> Result<Self> {
        settings.validate()?;
        let transport = services.transport(&settings.transport)?;
        let identity = Arc::new(FileHostIdentity::from_settings(settings));
        Ok(Self::new(identity, transport)
            .with_guard(SafetyGuard::new(settings.ca_certname.clone()))
            .check_revocation(settings.certificate_revocation))
    }

    /// Replace the trust verifier.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn TrustVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Replace the safety guard.
    #[must_use]
    pub fn with_guard(mut self, guard: SafetyGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Fetch and evaluate CRLs.
    #[must_use]
    pub const fn check_revocation(mut self, enabled: bool) -> Self {
        self.check_revocation = enabled;
        self
    }

    /// The certname every action runs for.
    pub fn certname(&self) -> &str {
        self.identity.certname()
    }

    /// Generate a key if needed, submit a CSR, then try to download the
    /// signed certificate.
    #[instrument(skip(self), fields(certname = %self.certname()))]
    pub async fn submit_request(&self) -> Result<SubmitOutcome> {
        self.submit_inner()
            .await
            .map_err(|e| e.in_action(Action::SubmitRequest, self.certname()))
    }

    /// Fetch the signed certificate and save it if it matches the local key.
    #[instrument(skip(self), fields(certname = %self.certname()))]
    pub async fn download_cert(&self) -> Result<DownloadOutcome> {
        self.download_inner()
            .await
            .map_err(|e| e.in_action(Action::DownloadCert, self.certname()))
    }

    /// Verify the local key and certificate against the local trust store.
    #[instrument(skip(self), fields(certname = %self.certname()))]
    pub async fn verify(&self) -> Result<VerifyReport> {
        self.verify_inner()
            .await
            .map_err(|e| e.in_action(Action::Verify, self.certname()))
    }

    /// Remove local credentials, unless the guard vetoes.
    #[instrument(skip(self), fields(certname = %self.certname()))]
    pub async fn clean(&self, localca: bool) -> Result<CleanReport> {
        self.clean_inner(localca)
            .await
            .map_err(|e| e.in_action(Action::Clean, self.certname()))
    }

    /// Report local artifacts without touching the network.
    pub fn status(&self) -> Result<StatusReport> {
        self.status_inner()
            .map_err(|e| e.in_action(Action::Status, self.certname()))
    }

    async fn submit_inner(&self) -> Result<SubmitOutcome> {
        let certname = self.certname();
        self.ensure_ca_certificate().await?;

        let (key, key_generated) = match self.identity.key()? {
            Some(key) => (key, false),
            None => {
                info!(certname, "generating private key");
                let key = KeyPair::generate()?;
                self.identity.save_key(&key)?;
                (key, true)
            }
        };

        let request = SigningRequest::build(&key, certname)?;
        self.transport.submit(&request).await?;
        self.identity.save_certificate_request(&request)?;
        info!(certname, fingerprint = %request.fingerprint, "certificate request submitted");

        let download = self.download_inner().await?;
        Ok(SubmitOutcome {
            request,
            key_generated,
            download,
        })
    }

    async fn download_inner(&self) -> Result<DownloadOutcome> {
        let certname = self.certname();
        self.ensure_ca_certificate().await?;
        self.refresh_crl().await?;

        let Some(cert) = self.transport.fetch_certificate(certname).await? else {
            info!(certname, "certificate not signed yet");
            return Ok(DownloadOutcome::NotReady);
        };

        let key = self.identity.key()?.ok_or_else(|| CertError::MissingKey {
            certname: certname.to_string(),
        })?;
        if !key.matches(&cert) {
            return Err(CertError::KeyMismatch {
                certname: certname.to_string(),
            });
        }
        if cert.common_name.as_deref() != Some(certname) {
            warn!(
                certname,
                subject = %cert.subject,
                "downloaded certificate subject does not name this certname"
            );
        }

        self.identity.save_certificate(&cert)?;
        info!(certname, fingerprint = %cert.fingerprint, "certificate saved");
        Ok(DownloadOutcome::Saved(cert))
    }

    async fn verify_inner(&self) -> Result<VerifyReport> {
        let certname = self.certname();
        self.ensure_ca_certificate().await?;

        let key = self.identity.key()?;
        let cert = self.identity.check_for_certificate_on_disk()?;
        let trust = self.identity.ssl_store()?.revocation(self.check_revocation);

        let chain = self
            .verifier
            .verify(key.as_ref(), cert.as_ref(), &trust)
            .map_err(|failure| failure.into_error(certname))?;
        let cert = cert.ok_or_else(|| CertError::MissingCertificate {
            certname: certname.to_string(),
        })?;

        info!(certname, revocation_checked = chain.revocation_checked, "certificate verified");
        Ok(VerifyReport {
            certname: certname.to_string(),
            fingerprint: cert.fingerprint,
            not_after: cert.not_after,
            chain,
        })
    }

    async fn clean_inner(&self, localca: bool) -> Result<CleanReport> {
        let certname = self.certname();
        self.guard
            .may_clean(certname, self.transport.as_ref())
            .await?
            .into_result()?;

        let mut report = CleanReport {
            certname: certname.to_string(),
            ..CleanReport::default()
        };
        for role in ArtifactRole::clean_set(localca) {
            if self.identity.remove(role)? {
                report.removed.push(role);
            } else {
                debug!(certname, role = %role, "already absent");
                report.absent.push(role);
            }
        }
        Ok(report)
    }

    fn status_inner(&self) -> Result<StatusReport> {
        let presence = self.identity.presence();
        Ok(StatusReport {
            certname: self.certname().to_string(),
            stage: LifecycleStage::from_presence(&presence),
            present: presence.present().collect(),
            certificate: self.identity.check_for_certificate_on_disk()?,
        })
    }

    /// Fetch the CA bundle unless a local copy exists.
    async fn ensure_ca_certificate(&self) -> Result<()> {
        if self.identity.presence().contains(ArtifactRole::CaBundle) {
            return Ok(());
        }

        info!("downloading CA certificate");
        let pem = self.transport.fetch_ca_bundle().await?;
        let bundle = Certificate::parse_bundle(&pem)?;
        let Some(anchor) = bundle.first() else {
            return Err(CertError::Crypto("CA returned an empty certificate bundle".into()));
        };
        self.identity.save_ca_bundle(&pem)?;
        info!(
            subject = %anchor.subject,
            fingerprint = %anchor.fingerprint,
            certificates = bundle.len(),
            "CA certificate saved"
        );
        Ok(())
    }

    /// Replace the local CRL with the CA's current one when revocation
    /// checking is on. A CA without a CRL leaves the local copy alone.
    async fn refresh_crl(&self) -> Result<()> {
        if !self.check_revocation {
            return Ok(());
        }

        match self.transport.fetch_crl().await? {
            Some(pem) => {
                let crls = RevocationList::parse_many(&pem)?;
                self.identity.save_crl(&pem)?;
                info!(lists = crls.len(), "CRL saved");
            }
            None => debug!("CA publishes no CRL"),
        }
        Ok(())
    }
}
