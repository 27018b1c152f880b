//! Credential and trust types.

mod artifact;
mod certificate;
mod crl;
mod key;
mod trust;

pub use artifact::{ArtifactPresence, ArtifactRole, LifecycleStage};
pub use certificate::Certificate;
pub use crl::RevocationList;
pub use key::{KeyPair, SigningRequest};
pub use trust::{ChainLink, TrustContext, VerifiedChain, VerifyFailure};
