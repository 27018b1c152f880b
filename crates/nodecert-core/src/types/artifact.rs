//! On-disk credential artifacts and the lifecycle stage they imply.
//!
//! There is no persisted state record. The stage is recomputed from which
//! artifacts exist every time it is needed:
//!
//! ```text
//! NoKeyNoCert -> KeyOnly -> RequestSubmitted -> CertDownloaded -> Cleaned
//! ```

use std::fmt;

use serde::Serialize;

/// Role of a single credential file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    PrivateKey,
    PublicKey,
    CertificateRequest,
    Certificate,
    PasswordFile,
    CaBundle,
    Crl,
}

impl ArtifactRole {
    /// Every role, host artifacts first.
    pub const ALL: [Self; 7] = [
        Self::PrivateKey,
        Self::PublicKey,
        Self::CertificateRequest,
        Self::Certificate,
        Self::PasswordFile,
        Self::CaBundle,
        Self::Crl,
    ];

    /// Artifacts that belong to this node's identity.
    pub const HOST: [Self; 5] = [
        Self::PrivateKey,
        Self::PublicKey,
        Self::CertificateRequest,
        Self::Certificate,
        Self::PasswordFile,
    ];

    /// Local copies of CA material.
    pub const LOCAL_CA: [Self; 2] = [Self::CaBundle, Self::Crl];

    /// The roles removed by a clean.
    #[must_use]
    pub fn clean_set(localca: bool) -> Vec<Self> {
        let mut roles = Self::HOST.to_vec();
        if localca {
            roles.extend(Self::LOCAL_CA);
        }
        roles
    }

    /// Human readable name.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::PrivateKey => "private key",
            Self::PublicKey => "public key",
            Self::CertificateRequest => "certificate request",
            Self::Certificate => "certificate",
            Self::PasswordFile => "private key password file",
            Self::CaBundle => "local CA bundle",
            Self::Crl => "local CRL",
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which artifacts currently exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactPresence {
    present: [bool; 7],
}

impl ArtifactPresence {
    /// Build from a predicate over roles.
    pub fn from_fn(mut exists: impl FnMut(ArtifactRole) -> bool) -> Self {
        let mut presence = Self::default();
        for role in ArtifactRole::ALL {
            presence.set(role, exists(role));
        }
        presence
    }

    /// Mark a role present or absent.
    pub fn set(&mut self, role: ArtifactRole, present: bool) {
        self.present[role as usize] = present;
    }

    /// Whether the role's file exists.
    #[must_use]
    pub const fn contains(&self, role: ArtifactRole) -> bool {
        self.present[role as usize]
    }

    /// Roles that exist, in [`ArtifactRole::ALL`] order.
    pub fn present(&self) -> impl Iterator<Item = ArtifactRole> + '_ {
        ArtifactRole::ALL.into_iter().filter(|r| self.contains(*r))
    }
}

/// Lifecycle stage implied by artifact presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    /// Nothing on disk
    NoKeyNoCert,
    /// A key exists but no request was submitted
    KeyOnly,
    /// A CSR exists and no certificate has been downloaded
    RequestSubmitted,
    /// Key and certificate both exist
    CertDownloaded,
    /// Host artifacts are gone but CA material remains
    Cleaned,
    /// A certificate exists without its private key
    Inconsistent,
}

impl LifecycleStage {
    /// Derive the stage. Pure; never cached.
    #[must_use]
    pub const fn from_presence(presence: &ArtifactPresence) -> Self {
        let key = presence.contains(ArtifactRole::PrivateKey);
        let csr = presence.contains(ArtifactRole::CertificateRequest);
        let cert = presence.contains(ArtifactRole::Certificate);
        let ca = presence.contains(ArtifactRole::CaBundle) || presence.contains(ArtifactRole::Crl);

        match (key, csr, cert) {
            (true, _, true) => Self::CertDownloaded,
            (false, _, true) => Self::Inconsistent,
            (_, true, false) => Self::RequestSubmitted,
            (true, false, false) => Self::KeyOnly,
            (false, false, false) if ca => Self::Cleaned,
            (false, false, false) => Self::NoKeyNoCert,
        }
    }

    /// What the operator should do next.
    #[must_use]
    pub const fn hint(&self) -> &'static str {
        match self {
            Self::NoKeyNoCert | Self::Cleaned | Self::KeyOnly => "run submit_request",
            Self::RequestSubmitted => "wait for the CA to sign, then run download_cert",
            Self::CertDownloaded => "run verify to check the certificate",
            Self::Inconsistent => "run clean, then submit_request",
        }
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoKeyNoCert => "no key, no certificate",
            Self::KeyOnly => "key only",
            Self::RequestSubmitted => "request submitted",
            Self::CertDownloaded => "certificate downloaded",
            Self::Cleaned => "cleaned",
            Self::Inconsistent => "certificate without key",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presence(roles: &[ArtifactRole]) -> ArtifactPresence {
        ArtifactPresence::from_fn(|r| roles.contains(&r))
    }

    #[test]
    fn clean_set_respects_localca() {
        let host = ArtifactRole::clean_set(false);
        assert_eq!(host.len(), 5);
        assert!(!host.contains(&ArtifactRole::CaBundle));
        assert!(!host.contains(&ArtifactRole::Crl));

        let all = ArtifactRole::clean_set(true);
        assert_eq!(all.len(), 7);
        assert!(all.contains(&ArtifactRole::CaBundle));
        assert!(all.contains(&ArtifactRole::Crl));
    }

    #[test]
    fn stages_follow_the_lifecycle() {
        use ArtifactRole::*;

        assert_eq!(LifecycleStage::from_presence(&presence(&[])), LifecycleStage::NoKeyNoCert);
        assert_eq!(
            LifecycleStage::from_presence(&presence(&[PrivateKey, PublicKey, CaBundle])),
            LifecycleStage::KeyOnly
        );
        assert_eq!(
            LifecycleStage::from_presence(&presence(&[PrivateKey, CertificateRequest, CaBundle])),
            LifecycleStage::RequestSubmitted
        );
        assert_eq!(
            LifecycleStage::from_presence(&presence(&[
                PrivateKey,
                CertificateRequest,
                Certificate,
                CaBundle
            ])),
            LifecycleStage::CertDownloaded
        );
        assert_eq!(
            LifecycleStage::from_presence(&presence(&[CaBundle, Crl])),
            LifecycleStage::Cleaned
        );
        assert_eq!(
            LifecycleStage::from_presence(&presence(&[Certificate])),
            LifecycleStage::Inconsistent
        );
    }

    #[test]
    fn presence_lists_in_role_order() {
        let p = presence(&[ArtifactRole::Crl, ArtifactRole::PrivateKey]);
        let listed: Vec<_> = p.present().collect();
        assert_eq!(listed, vec![ArtifactRole::PrivateKey, ArtifactRole::Crl]);
    }
}
