//! # nodecert-cli
//!
//! Command-line interface for the nodecert certificate lifecycle manager.
//!
//! ## Actions
//!
//! - **submit_request**: generate a key if needed, submit a CSR, download once signed
//! - **download_cert**: fetch the signed certificate from the CA
//! - **verify**: check the local key and certificate against the CA bundle and CRL
//! - **clean**: remove local credentials (`--localca` also removes CA material)
//! - **status**: show which artifacts exist and what to do next

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
