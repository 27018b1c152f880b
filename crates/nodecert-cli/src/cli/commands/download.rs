//! `nodecert download_cert` - fetch the signed certificate.

use anyhow::Result;
use colored::Colorize;
use nodecert::DownloadOutcome;

use super::Context;
use crate::output::{field, print_json, OutputFormat};

pub async fn execute(ctx: &Context) -> Result<()> {
    let outcome = ctx.orchestrator.download_cert().await?;

    match ctx.output_format {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Pretty => {
            print_outcome(ctx.certname(), &outcome);
            Ok(())
        }
    }
}

/// Pretty form, shared with submit_request.
pub fn print_outcome(certname: &str, outcome: &DownloadOutcome) {
    match outcome {
        DownloadOutcome::NotReady => {
            println!(
                "{}",
                format!("Certificate for '{certname}' has not been signed yet").yellow()
            );
            println!(
                "{}",
                "Run download_cert again once the CA has signed the request.".dimmed()
            );
        }
        DownloadOutcome::Saved(cert) => {
            println!(
                "{}",
                format!("Downloaded certificate for '{certname}'").green()
            );
            field("Fingerprint", &cert.fingerprint);
            field("Serial", &cert.serial);
            field("Valid until", cert.not_after.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }
}
