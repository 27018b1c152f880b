//! End-to-end lifecycle against an in-process CA.

mod common;

use std::sync::Arc;

use common::StubCa;
use nodecert::{
    ArtifactPaths, ArtifactRole, CaTransport, DownloadOutcome, ErrorKind, FileHostIdentity,
    HostIdentity, KeyPair, LifecycleStage, Orchestrator, SafetyGuard, Services, Settings,
    HTTP_TRANSPORT,
};
use tempfile::TempDir;
use time::Duration;

struct Node {
    _dir: TempDir,
    identity: Arc<FileHostIdentity>,
    ca: Arc<StubCa>,
}

impl Node {
    fn new(auto_sign: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let identity = Arc::new(FileHostIdentity::new(
            "agent1",
            ArtifactPaths::in_ssldir(dir.path(), "agent1"),
        ));
        Self {
            _dir: dir,
            identity,
            ca: Arc::new(StubCa::new(auto_sign)),
        }
    }

    fn orchestrator(&self) -> Orchestrator {
        let identity: Arc<dyn HostIdentity> = self.identity.clone();
        let transport: Arc<dyn CaTransport> = self.ca.clone();
        Orchestrator::new(identity, transport)
    }

    fn stage(&self) -> LifecycleStage {
        LifecycleStage::from_presence(&self.identity.presence())
    }

    async fn enrolled(auto_sign: bool) -> Self {
        let node = Self::new(auto_sign);
        node.orchestrator().submit_request().await.unwrap();
        node
    }
}

#[tokio::test]
async fn test_fresh_node_enrolls_with_auto_signing_ca() {
    let node = Node::new(true);
    assert_eq!(node.stage(), LifecycleStage::NoKeyNoCert);

    let outcome = node.orchestrator().submit_request().await.unwrap();
    assert!(outcome.key_generated);

    let DownloadOutcome::Saved(cert) = outcome.download else {
        panic!("auto-signing CA should yield a certificate");
    };
    assert_eq!(cert.common_name.as_deref(), Some("agent1"));

    let key = node.identity.key().unwrap().unwrap();
    assert!(key.matches(&cert));
    assert_eq!(cert.public_key_der(), key.public_key_der());
    assert_eq!(node.stage(), LifecycleStage::CertDownloaded);
    assert!(node.identity.presence().contains(ArtifactRole::CaBundle));
    assert!(node.identity.presence().contains(ArtifactRole::Crl));

    let report = node.orchestrator().verify().await.unwrap();
    assert_eq!(report.certname, "agent1");
    assert_eq!(report.fingerprint, cert.fingerprint);
    assert_eq!(report.chain.links.len(), 2);
    assert!(report.chain.revocation_checked);
}

#[tokio::test]
async fn test_pending_request_then_download() {
    let node = Node::new(false);
    let orchestrator = node.orchestrator();

    let outcome = orchestrator.submit_request().await.unwrap();
    assert!(matches!(outcome.download, DownloadOutcome::NotReady));
    assert!(node.ca.is_pending("agent1"));
    assert_eq!(node.stage(), LifecycleStage::RequestSubmitted);

    let err = orchestrator.submit_request().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadySubmitted);

    assert!(matches!(
        orchestrator.download_cert().await.unwrap(),
        DownloadOutcome::NotReady
    ));

    node.ca.sign("agent1");
    let DownloadOutcome::Saved(cert) = orchestrator.download_cert().await.unwrap() else {
        panic!("signed certificate should download");
    };
    assert!(node.identity.key().unwrap().unwrap().matches(&cert));
    assert_eq!(node.stage(), LifecycleStage::CertDownloaded);
}

#[tokio::test]
async fn test_resubmit_reuses_existing_key() {
    let node = Node::new(false);
    node.identity.save_key(&KeyPair::generate().unwrap()).unwrap();
    let before = node.identity.key().unwrap().unwrap();

    let outcome = node.orchestrator().submit_request().await.unwrap();
    assert!(!outcome.key_generated);
    assert_eq!(
        node.identity.key().unwrap().unwrap().public_key_der(),
        before.public_key_der()
    );
}

#[tokio::test]
async fn test_rotated_key_is_key_mismatch_and_keeps_certificate() {
    let node = Node::enrolled(true).await;
    let original = node.identity.check_for_certificate_on_disk().unwrap().unwrap();

    node.identity.save_key(&KeyPair::generate().unwrap()).unwrap();

    let err = node.orchestrator().download_cert().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyMismatch);

    let kept = node.identity.check_for_certificate_on_disk().unwrap().unwrap();
    assert_eq!(kept.fingerprint, original.fingerprint);
}

#[tokio::test]
async fn test_verify_reports_key_cert_mismatch() {
    let node = Node::enrolled(true).await;
    node.identity.save_key(&KeyPair::generate().unwrap()).unwrap();

    let err = node.orchestrator().verify().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::KeyCertMismatch);
}

#[tokio::test]
async fn test_verify_rejects_foreign_ca_bundle() {
    let node = Node::enrolled(true).await;
    let foreign = StubCa::new(true);
    node.identity.save_ca_bundle(&foreign.ca_pem()).unwrap();

    let err = node.orchestrator().check_revocation(false).verify().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChainInvalid);
}

#[tokio::test]
async fn test_revoked_certificate_fails_verify() {
    let node = Node::enrolled(true).await;
    node.ca.revoke("agent1");

    // The CRL saved at enrollment predates the revocation.
    node.orchestrator().verify().await.unwrap();

    node.orchestrator().download_cert().await.unwrap();
    let err = node.orchestrator().verify().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Revoked);

    let report = node.orchestrator().check_revocation(false).verify().await.unwrap();
    assert!(!report.chain.revocation_checked);
}

#[tokio::test]
async fn test_missing_crl_fails_verify_when_revocation_is_on() {
    let node = Node::enrolled(true).await;
    node.ca.revoke("agent1");
    node.identity.remove(ArtifactRole::Crl).unwrap();

    let err = node.orchestrator().verify().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChainInvalid);
    assert!(err.to_string().contains("unable to get certificate CRL"));
    assert!(!node.identity.presence().contains(ArtifactRole::Crl));

    let report = node.orchestrator().check_revocation(false).verify().await.unwrap();
    assert!(!report.chain.revocation_checked);
}

#[tokio::test]
async fn test_download_replaces_stale_crl() {
    let node = Node::new(true);
    node.ca.set_crl_lifetime(Duration::hours(-1));
    node.orchestrator().submit_request().await.unwrap();

    let err = node.orchestrator().verify().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChainInvalid);
    assert!(err.to_string().contains("has expired"));

    node.ca.set_crl_lifetime(Duration::days(1));
    node.orchestrator().download_cert().await.unwrap();

    let report = node.orchestrator().verify().await.unwrap();
    assert!(report.chain.revocation_checked);
}

#[tokio::test]
async fn test_clean_twice_is_a_no_op() {
    let node = Node::enrolled(true).await;
    let orchestrator = node.orchestrator();

    let first = orchestrator.clean(false).await.unwrap();
    assert_eq!(
        first.removed,
        vec![
            ArtifactRole::PrivateKey,
            ArtifactRole::PublicKey,
            ArtifactRole::CertificateRequest,
            ArtifactRole::Certificate,
        ]
    );
    assert_eq!(first.absent, vec![ArtifactRole::PasswordFile]);

    let second = orchestrator.clean(false).await.unwrap();
    assert!(second.removed.is_empty());
    assert_eq!(second.absent, ArtifactRole::clean_set(false));

    let presence = node.identity.presence();
    assert!(presence.contains(ArtifactRole::CaBundle));
    assert!(presence.contains(ArtifactRole::Crl));
    assert_eq!(node.stage(), LifecycleStage::Cleaned);
}

#[tokio::test]
async fn test_clean_localca_removes_ca_material() {
    let node = Node::enrolled(true).await;

    let report = node.orchestrator().clean(true).await.unwrap();
    assert!(report.removed.contains(&ArtifactRole::CaBundle));
    assert!(report.removed.contains(&ArtifactRole::Crl));
    assert_eq!(node.identity.presence().present().count(), 0);
    assert_eq!(node.stage(), LifecycleStage::NoKeyNoCert);
}

#[tokio::test]
async fn test_guard_veto_removes_nothing() {
    let node = Node::enrolled(true).await;
    let before = node.identity.presence();

    let err = node
        .orchestrator()
        .with_guard(SafetyGuard::new(Some("agent1".into())))
        .clean(true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsafeOperation);
    assert!(err.to_string().contains("on the CA server first"));
    assert_eq!(node.identity.presence(), before);

    node.ca.clean("agent1");
    node.orchestrator()
        .with_guard(SafetyGuard::new(Some("agent1".into())))
        .clean(false)
        .await
        .unwrap();
    assert_eq!(node.stage(), LifecycleStage::Cleaned);
}

#[tokio::test]
async fn test_services_select_transport_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        certname: "agent1".into(),
        ssldir: dir.path().to_path_buf(),
        ..Settings::default()
    };
    let services = Services::from_settings(&settings);
    let default_transport = services.transport(HTTP_TRANSPORT).unwrap();

    let stub = Arc::new(StubCa::new(true));
    let transport: Arc<dyn CaTransport> = stub.clone();
    services.transports.set(HTTP_TRANSPORT, transport);

    let orchestrator = Orchestrator::from_settings(&settings, &services).unwrap();
    let outcome = orchestrator.submit_request().await.unwrap();
    assert!(matches!(outcome.download, DownloadOutcome::Saved(_)));
    assert!(stub.holds("agent1"));

    services.transports.reset();
    let restored = services.transport(HTTP_TRANSPORT).unwrap();
    assert!(!Arc::ptr_eq(&restored, &default_transport));

    let unknown = Settings {
        transport: "carrier-pigeon".into(),
        ..settings
    };
    let err = Orchestrator::from_settings(&unknown, &services).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownService);
}
