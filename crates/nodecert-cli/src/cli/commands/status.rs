//! `nodecert status` - show local artifacts. Never contacts the CA.

use anyhow::Result;
use colored::Colorize;
use nodecert::LifecycleStage;

use super::Context;
use crate::output::{field, print_json, OutputFormat};

pub fn execute(ctx: &Context) -> Result<()> {
    let report = ctx.orchestrator.status()?;

    match ctx.output_format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Pretty => {
            let stage = report.stage.to_string();
            let stage = match report.stage {
                LifecycleStage::CertDownloaded => stage.green(),
                LifecycleStage::Inconsistent => stage.red(),
                _ => stage.yellow(),
            };
            println!("{} {}", "Certname:".bold(), report.certname.cyan().bold());
            field("Stage", stage);
            field("Next", report.stage.hint());

            let present: Vec<&str> = report.present.iter().map(|r| r.label()).collect();
            field(
                "Present",
                if present.is_empty() {
                    "none".to_string()
                } else {
                    present.join(", ")
                },
            );

            if let Some(cert) = &report.certificate {
                field("Fingerprint", &cert.fingerprint);
                field("Valid until", cert.not_after.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            Ok(())
        }
    }
}
