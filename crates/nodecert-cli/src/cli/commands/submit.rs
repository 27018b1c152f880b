//! `nodecert submit_request` - send a CSR to the CA, then try to download.

use anyhow::Result;
use colored::Colorize;

use super::{download, Context};
use crate::output::{field, print_json, OutputFormat};

pub async fn execute(ctx: &Context) -> Result<()> {
    let outcome = ctx.orchestrator.submit_request().await?;

    match ctx.output_format {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Pretty => {
            if outcome.key_generated {
                println!("{}", "Generated a new private key".dimmed());
            }
            println!(
                "{}",
                format!("Submitted certificate request for '{}'", ctx.certname()).green()
            );
            field("Fingerprint", &outcome.request.fingerprint);
            println!();
            download::print_outcome(ctx.certname(), &outcome.download);
            Ok(())
        }
    }
}
