//! `nodecert verify` - check the local key and certificate.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::output::{field, print_json, OutputFormat};

pub async fn execute(ctx: &Context) -> Result<()> {
    let mut report = ctx.orchestrator.verify().await?;

    match ctx.output_format {
        OutputFormat::Json => {
            if !ctx.show_chain {
                report.chain.links.clear();
            }
            print_json(&report)
        }
        OutputFormat::Pretty => {
            println!(
                "{}",
                format!("Verified certificate '{}'", report.certname).green()
            );
            field("Fingerprint", &report.fingerprint);
            field("Valid until", report.not_after.format("%Y-%m-%d %H:%M:%S UTC"));
            field(
                "Revocation",
                if report.chain.revocation_checked {
                    "checked against CRL"
                } else {
                    "not checked"
                },
            );

            if ctx.show_chain {
                println!();
                println!("{}", "Chain:".bold());
                for (depth, link) in report.chain.links.iter().enumerate() {
                    println!("  {depth}. {}", link.subject);
                    println!("     {}", link.fingerprint.dimmed());
                }
            }
            Ok(())
        }
    }
}
