//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::Parser;

use crate::output::OutputFormat;

/// Enroll this node with a certificate authority and keep it trusted
///
/// Actions: submit_request, download_cert, verify, clean, status
#[derive(Parser, Debug)]
#[command(name = "nodecert")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Action to perform (submit_request, download_cert, verify, clean, status)
    #[arg(value_name = "ACTION")]
    pub action: String,

    /// Certname to act on (default: from settings, else the host name)
    #[arg(long, env = "NODECERT_CERTNAME")]
    pub certname: Option<String>,

    /// With clean, also remove the local CA bundle and CRL
    #[arg(long)]
    pub localca: bool,

    /// Settings file (TOML)
    #[arg(short, long, env = "NODECERT_CONFIG")]
    pub config: Option<PathBuf>,

    /// CA host name
    #[arg(long)]
    pub ca_server: Option<String>,

    /// CA port
    #[arg(long)]
    pub ca_port: Option<u16>,

    /// Directory holding keys and certificates
    #[arg(long)]
    pub ssldir: Option<PathBuf>,

    /// After verify, print the validated chain
    #[arg(long)]
    pub show_chain: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Log debug details to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}
