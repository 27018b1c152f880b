//! Client-side certificate lifecycle manager.
//!
//! Enrolls a node with a certificate authority and keeps its credentials
//! consistent with the CA's view of it: request a certificate, download it
//! once signed, verify the local key/certificate pair against the CA bundle
//! and CRL, and clean local artifacts when the node is retired.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use nodecert::{Orchestrator, Services, Settings};
//!
//! #[tokio::main]
//! async fn main() -> nodecert::Result<()> {
//!     let settings = Settings::load(std::path::Path::new("nodecert.toml"))?;
//!     let services = Services::from_settings(&settings);
//!     let orchestrator = Orchestrator::from_settings(&settings, &services)?;
//!
//!     let outcome = orchestrator.submit_request().await?;
//!     println!("submitted {}", outcome.request.fingerprint);
//!
//!     let chain = orchestrator.verify().await?;
//!     println!("verified until {}", chain.not_after);
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Uses rustls for TLS
//! - `rustls` - Use rustls for TLS (recommended)
//! - `native-tls` - Use system native TLS

#![doc(html_root_url = "https://docs.rs/nodecert/0.3.0")]

mod guard;
mod identity;
mod orchestrator;
mod registry;
mod settings;
pub mod verifier;

// Re-export core types
pub use nodecert_core::*;

// Re-export transport
pub use nodecert_client::{HttpCaTransport, HttpCaTransportBuilder, TransportConfig};

pub use guard::{CleanVerdict, HeldCertificate, SafetyGuard};
pub use identity::FileHostIdentity;
pub use orchestrator::{
    CleanReport, DownloadOutcome, Orchestrator, StatusReport, SubmitOutcome, VerifyReport,
};
pub use registry::{ServiceRegistry, Services, HTTP_TRANSPORT};
pub use settings::{ArtifactPaths, PathOverrides, Settings};
pub use verifier::ChainVerifier;

// Re-export runtime for convenience
pub use tokio;
