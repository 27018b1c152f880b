//! `nodecert clean` - remove local credentials.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::output::{print_json, OutputFormat};

pub async fn execute(ctx: &Context, localca: bool) -> Result<()> {
    let report = ctx.orchestrator.clean(localca).await?;

    match ctx.output_format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Pretty => {
            if report.removed.is_empty() {
                println!(
                    "{}",
                    format!("Nothing to clean for '{}'", report.certname).dimmed()
                );
                return Ok(());
            }
            for role in &report.removed {
                println!("Removed {}", role.label());
            }
            println!(
                "{}",
                format!("Cleaned local credentials for '{}'", report.certname).green()
            );
            Ok(())
        }
    }
}
