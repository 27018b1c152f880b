//! Core types and traits for the nodecert certificate lifecycle manager.
//!
//! This crate provides the foundational pieces shared by the transport, the
//! lifecycle logic and the CLI:
//!
//! - **Types**: keys, CSRs, certificates, CRLs, trust contexts, artifact roles
//! - **Traits**: [`HostIdentity`], [`CaTransport`], [`TrustVerifier`]
//! - **Errors**: [`CertError`] with a branchable [`ErrorKind`]
//!
//! # Example
//!
//! ```rust,ignore
//! use nodecert_core::{KeyPair, SigningRequest, Result};
//!
//! fn request(certname: &str) -> Result<SigningRequest> {
//!     let key = KeyPair::generate()?;
//!     SigningRequest::build(&key, certname)
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/nodecert-core/0.3.0")]

mod action;
mod error;
pub mod hash;
mod traits;
pub mod types;

pub use action::Action;
pub use error::{BoxError, CertError, ErrorKind, Result};
pub use traits::{CaTransport, HostIdentity, TrustVerifier};
pub use types::*;
