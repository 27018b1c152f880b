//! HTTP transport to the certificate authority.
//!
//! This crate provides [`HttpCaTransport`], the default implementation of
//! [`nodecert_core::CaTransport`].

#![doc(html_root_url = "https://docs.rs/nodecert-client/0.3.0")]

mod client;
mod config;

pub use client::{HttpCaTransport, HttpCaTransportBuilder};
pub use config::*;
pub use nodecert_core::{CertError, Result};
