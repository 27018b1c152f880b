//! Chain and revocation checks for the host certificate.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. a private key exists
//! 2. a certificate exists
//! 3. the certificate's public key is the private key's
//! 4. the certificate chains to a self-issued anchor in the CA bundle
//! 5. no certificate on the path is revoked (when the trust context
//!    checks revocation, each issuer must have a CRL)
//!
//! Chain failures carry the OpenSSL `X509_V_ERR_*` code for the same
//! condition so operators can search for them.

use chrono::{DateTime, Utc};
use nodecert_core::{
    Certificate, ChainLink, KeyPair, RevocationList, TrustContext, TrustVerifier, VerifiedChain,
    VerifyFailure,
};
use tracing::debug;
use x509_parser::prelude::*;
use x509_parser::revocation_list::CertificateRevocationList;

/// Validator error codes.
pub mod codes {
    pub const UNABLE_TO_GET_CRL: i32 = 3;
    pub const CERT_SIGNATURE_FAILURE: i32 = 7;
    pub const CRL_SIGNATURE_FAILURE: i32 = 8;
    pub const CERT_NOT_YET_VALID: i32 = 9;
    pub const CERT_HAS_EXPIRED: i32 = 10;
    pub const CRL_HAS_EXPIRED: i32 = 12;
    pub const DEPTH_ZERO_SELF_SIGNED_CERT: i32 = 18;
    pub const UNABLE_TO_GET_ISSUER_CERT_LOCALLY: i32 = 20;
    pub const CERT_CHAIN_TOO_LONG: i32 = 22;
    pub const CERT_REVOKED: i32 = 23;
    pub const INVALID_CA: i32 = 24;
}

/// Default limit on intermediates between the leaf and its anchor.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Path-building verifier backed by `x509-parser`.
#[derive(Debug, Clone)]
pub struct ChainVerifier {
    at: Option<DateTime<Utc>>,
    max_depth: usize,
}

impl Default for ChainVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainVerifier {
    /// Verify against the current time.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            at: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Verify as of a fixed instant instead of now.
    #[must_use]
    pub const fn at_time(mut self, at: DateTime<Utc>) -> Self {
        self.at = Some(at);
        self
    }

    /// Limit the number of CA certificates above the leaf.
    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    fn build_path(
        &self,
        leaf: &Certificate,
        bundle: &[Certificate],
        now: DateTime<Utc>,
    ) -> Result<Vec<Certificate>, VerifyFailure> {
        check_validity(leaf, now)?;
        let mut path = vec![leaf.clone()];
        let mut current = leaf;

        loop {
            if current.is_self_issued() {
                if bundle.contains(current) {
                    return Ok(path);
                }
                return Err(chain_invalid(
                    codes::DEPTH_ZERO_SELF_SIGNED_CERT,
                    format!("self-signed certificate '{}' is not in the CA bundle", current.subject),
                ));
            }

            if path.len() > self.max_depth {
                return Err(chain_invalid(
                    codes::CERT_CHAIN_TOO_LONG,
                    format!("certificate chain longer than {} certificates", self.max_depth),
                ));
            }

            let issuer = find_issuer(current, bundle)?;
            if !is_ca(issuer) {
                return Err(chain_invalid(
                    codes::INVALID_CA,
                    format!("issuer '{}' is not a CA certificate", issuer.subject),
                ));
            }
            check_validity(issuer, now)?;
            debug!(subject = %current.subject, issuer = %issuer.subject, "chain link verified");
            path.push(issuer.clone());
            current = issuer;
        }
    }
}

impl TrustVerifier for ChainVerifier {
    fn verify(
        &self,
        key: Option<&KeyPair>,
        cert: Option<&Certificate>,
        trust: &TrustContext,
    ) -> Result<VerifiedChain, VerifyFailure> {
        let key = key.ok_or(VerifyFailure::MissingKey)?;
        let cert = cert.ok_or(VerifyFailure::MissingCertificate)?;
        if !key.matches(cert) {
            return Err(VerifyFailure::KeyCertMismatch);
        }

        let now = self.at.unwrap_or_else(Utc::now);
        let path = self.build_path(cert, &trust.ca_bundle, now)?;

        let revocation_checked = trust.checks_revocation();
        if revocation_checked {
            for pair in path.windows(2) {
                check_revocation(&pair[0], &pair[1], &trust.crls, now)?;
            }
        }

        Ok(VerifiedChain {
            links: path.iter().map(ChainLink::from).collect(),
            revocation_checked,
        })
    }
}

fn chain_invalid(code: i32, message: String) -> VerifyFailure {
    VerifyFailure::ChainInvalid { code, message }
}

fn check_validity(cert: &Certificate, now: DateTime<Utc>) -> Result<(), VerifyFailure> {
    if now < cert.not_before {
        return Err(chain_invalid(
            codes::CERT_NOT_YET_VALID,
            format!("certificate '{}' is not valid before {}", cert.subject, cert.not_before),
        ));
    }
    if now > cert.not_after {
        return Err(chain_invalid(
            codes::CERT_HAS_EXPIRED,
            format!("certificate '{}' expired at {}", cert.subject, cert.not_after),
        ));
    }
    Ok(())
}

/// First bundle certificate whose subject is `child`'s issuer and whose key
/// verifies `child`'s signature.
fn find_issuer<'a>(
    child: &Certificate,
    bundle: &'a [Certificate],
) -> Result<&'a Certificate, VerifyFailure> {
    let mut named = bundle
        .iter()
        .filter(|c| c.subject_raw() == child.issuer_raw())
        .peekable();

    if named.peek().is_none() {
        return Err(chain_invalid(
            codes::UNABLE_TO_GET_ISSUER_CERT_LOCALLY,
            format!("unable to get local issuer certificate '{}'", child.issuer),
        ));
    }

    named.find(|issuer| signed_by(child, issuer)).ok_or_else(|| {
        chain_invalid(
            codes::CERT_SIGNATURE_FAILURE,
            format!("signature of '{}' does not verify against its issuer", child.subject),
        )
    })
}

fn signed_by(child: &Certificate, issuer: &Certificate) -> bool {
    let (Ok((_, child)), Ok((_, issuer))) = (
        X509Certificate::from_der(child.der()),
        X509Certificate::from_der(issuer.der()),
    ) else {
        return false;
    };
    child.verify_signature(Some(issuer.public_key())).is_ok()
}

fn is_ca(cert: &Certificate) -> bool {
    X509Certificate::from_der(cert.der()).is_ok_and(|(_, c)| c.is_ca())
}

fn check_revocation(
    subject: &Certificate,
    issuer: &Certificate,
    crls: &[RevocationList],
    now: DateTime<Utc>,
) -> Result<(), VerifyFailure> {
    let crl = crls
        .iter()
        .find(|crl| crl.issuer_raw() == issuer.subject_raw())
        .ok_or_else(|| {
            chain_invalid(
                codes::UNABLE_TO_GET_CRL,
                format!("unable to get certificate CRL for issuer '{}'", issuer.subject),
            )
        })?;

    if !crl_signed_by(crl, issuer) {
        return Err(chain_invalid(
            codes::CRL_SIGNATURE_FAILURE,
            format!("CRL signature from '{}' does not verify", issuer.subject),
        ));
    }
    if crl.is_stale_at(now) {
        return Err(chain_invalid(
            codes::CRL_HAS_EXPIRED,
            format!("CRL from '{}' has expired", issuer.subject),
        ));
    }
    if crl.is_revoked(subject.serial_bytes()) {
        debug!(code = codes::CERT_REVOKED, serial = %subject.serial, "certificate revoked");
        return Err(VerifyFailure::Revoked {
            serial: subject.serial.clone(),
        });
    }
    Ok(())
}

fn crl_signed_by(crl: &RevocationList, issuer: &Certificate) -> bool {
    let (Ok((_, crl)), Ok((_, issuer))) = (
        CertificateRevocationList::from_der(crl.der()),
        X509Certificate::from_der(issuer.der()),
    ) else {
        return false;
    };
    crl.verify_signature(issuer.public_key()).is_ok()
}
