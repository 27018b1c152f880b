//! One module per action.

pub mod clean;
pub mod download;
pub mod status;
pub mod submit;
pub mod verify;

use nodecert::Orchestrator;

use crate::output::OutputFormat;

/// Shared state for every action.
#[derive(Debug)]
pub struct Context {
    pub orchestrator: Orchestrator,
    pub output_format: OutputFormat,
    pub show_chain: bool,
}

impl Context {
    pub fn certname(&self) -> &str {
        self.orchestrator.certname()
    }
}
