//! CLI argument parsing and action dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::Cli;
use clap::Parser;
use nodecert::{Action, Orchestrator, Services};
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Reject unknown actions before touching settings or the network
    let action: Action = cli.action.parse()?;

    let settings = crate::config::load(&cli)?;
    let services = Services::from_settings(&settings);
    let orchestrator = Orchestrator::from_settings(&settings, &services)?;

    let ctx = commands::Context {
        orchestrator,
        output_format: cli.output.unwrap_or(OutputFormat::Pretty),
        show_chain: cli.show_chain,
    };

    if cli.localca && action != Action::Clean {
        tracing::warn!(action = %action, "--localca only applies to clean, ignoring");
    }

    match action {
        Action::SubmitRequest => commands::submit::execute(&ctx).await,
        Action::DownloadCert => commands::download::execute(&ctx).await,
        Action::Verify => commands::verify::execute(&ctx).await,
        Action::Clean => commands::clean::execute(&ctx, cli.localca).await,
        Action::Status => commands::status::execute(&ctx),
    }
}

/// Log to stderr. `RUST_LOG` wins; otherwise warnings, or debug with `-v`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
