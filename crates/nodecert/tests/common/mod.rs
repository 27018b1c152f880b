//! In-process certificate authority for lifecycle tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use nodecert::{CaTransport, CertError, Certificate, Result, SigningRequest};
use rcgen::{
    BasicConstraints, CertificateParams, CertificateRevocationListParams,
    CertificateSigningRequestParams, DistinguishedName, DnType, IsCa, KeyIdMethod,
    KeyUsagePurpose, RevokedCertParams, SerialNumber,
};
use time::{Duration, OffsetDateTime};

#[derive(Default)]
struct Ledger {
    pending: HashMap<String, String>,
    signed: HashMap<String, (u64, Certificate)>,
    revoked: Vec<u64>,
    next_serial: u64,
}

/// A CA that signs CSRs with an rcgen root and serves them back.
pub struct StubCa {
    cert: rcgen::Certificate,
    key: rcgen::KeyPair,
    auto_sign: bool,
    crl_lifetime: Mutex<Duration>,
    ledger: Mutex<Ledger>,
}

impl StubCa {
    pub fn new(auto_sign: bool) -> Self {
        let key = rcgen::KeyPair::generate().unwrap();
        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "Stub CA: ca.example.com");
        params.distinguished_name = dn;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        let cert = params.self_signed(&key).unwrap();

        Self {
            cert,
            key,
            auto_sign,
            crl_lifetime: Mutex::new(Duration::days(1)),
            ledger: Mutex::new(Ledger {
                next_serial: 2,
                ..Ledger::default()
            }),
        }
    }

    pub fn ca_pem(&self) -> String {
        self.cert.pem()
    }

    pub fn is_pending(&self, certname: &str) -> bool {
        self.ledger.lock().unwrap().pending.contains_key(certname)
    }

    pub fn holds(&self, certname: &str) -> bool {
        self.ledger.lock().unwrap().signed.contains_key(certname)
    }

    /// Sign a pending request.
    pub fn sign(&self, certname: &str) {
        let mut ledger = self.ledger.lock().unwrap();
        let csr = ledger.pending.remove(certname).expect("no pending request");
        let serial = ledger.next_serial;
        ledger.next_serial += 1;

        let mut params = CertificateSigningRequestParams::from_pem(&csr).unwrap();
        params.params.serial_number = Some(SerialNumber::from(serial));
        let cert = params.signed_by(&self.cert, &self.key).unwrap();
        let cert = Certificate::from_pem(&cert.pem()).unwrap();
        ledger.signed.insert(certname.to_string(), (serial, cert));
    }

    /// Revoke the signed certificate for `certname`.
    pub fn revoke(&self, certname: &str) {
        let mut ledger = self.ledger.lock().unwrap();
        let serial = ledger.signed[certname].0;
        ledger.revoked.push(serial);
    }

    /// Revoke and forget `certname`, as `puppetserver ca clean` would.
    pub fn clean(&self, certname: &str) {
        self.revoke(certname);
        self.ledger.lock().unwrap().signed.remove(certname);
    }

    /// How long newly issued CRLs stay current. Negative issues stale ones.
    pub fn set_crl_lifetime(&self, lifetime: Duration) {
        *self.crl_lifetime.lock().unwrap() = lifetime;
    }

    pub fn crl_pem(&self) -> String {
        let now = OffsetDateTime::now_utc();
        let revoked = self.ledger.lock().unwrap().revoked.clone();
        let lifetime = *self.crl_lifetime.lock().unwrap();
        CertificateRevocationListParams {
            this_update: now - Duration::hours(2),
            next_update: now + lifetime,
            crl_number: SerialNumber::from(revoked.len() as u64 + 1),
            issuing_distribution_point: None,
            revoked_certs: revoked
                .into_iter()
                .map(|serial| RevokedCertParams {
                    serial_number: SerialNumber::from(serial),
                    revocation_time: now - Duration::minutes(1),
                    reason_code: None,
                    invalidity_date: None,
                })
                .collect(),
            key_identifier_method: KeyIdMethod::Sha256,
        }
        .signed_by(&self.cert, &self.key)
        .unwrap()
        .pem()
        .unwrap()
    }
}

#[async_trait]
impl CaTransport for StubCa {
    async fn fetch_certificate(&self, certname: &str) -> Result<Option<Certificate>> {
        let ledger = self.ledger.lock().unwrap();
        Ok(ledger.signed.get(certname).map(|(_, cert)| cert.clone()))
    }

    async fn submit(&self, csr: &SigningRequest) -> Result<()> {
        {
            let mut ledger = self.ledger.lock().unwrap();
            if ledger.pending.contains_key(&csr.certname) {
                return Err(CertError::AlreadySubmitted {
                    certname: csr.certname.clone(),
                });
            }
            if ledger.signed.contains_key(&csr.certname) {
                return Err(CertError::Transport {
                    message: format!("{} already has a signed certificate", csr.certname),
                    status: Some(400),
                    source: None,
                });
            }
            ledger
                .pending
                .insert(csr.certname.clone(), csr.pem().to_string());
        }
        if self.auto_sign {
            self.sign(&csr.certname);
        }
        Ok(())
    }

    async fn fetch_ca_bundle(&self) -> Result<String> {
        Ok(self.ca_pem())
    }

    async fn fetch_crl(&self) -> Result<Option<String>> {
        Ok(Some(self.crl_pem()))
    }
}
