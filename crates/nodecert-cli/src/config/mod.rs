//! Settings resolution: file, then command-line overrides.

use std::path::PathBuf;

use anyhow::Result;
use nodecert::Settings;

use crate::cli::args::Cli;

/// The settings file to read: `--config`, else the per-user default.
pub fn settings_path(cli: &Cli) -> Option<PathBuf> {
    cli.config.clone().or_else(Settings::default_path)
}

/// Load settings and apply command-line overrides.
pub fn load(cli: &Cli) -> Result<Settings> {
    let mut settings = match settings_path(cli) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading settings");
            Settings::load(&path)?
        }
        None => Settings::default(),
    };

    if let Some(certname) = &cli.certname {
        settings.certname.clone_from(certname);
    }
    if let Some(server) = &cli.ca_server {
        settings.ca_server.clone_from(server);
    }
    if let Some(port) = cli.ca_port {
        settings.ca_port = port;
    }
    if let Some(ssldir) = &cli.ssldir {
        settings.ssldir.clone_from(ssldir);
    }

    settings.validate()?;
    Ok(settings)
}
