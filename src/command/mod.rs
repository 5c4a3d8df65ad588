//! Workflow Command Builders
//!
//! Builders turn a job configuration into the shell command line that
//! invokes the workflow engine inside the execution container. Keeping the
//! engine behind the [`CommandBuilder`] trait leaves the launcher
//! engine-agnostic.

pub mod nextflow;

pub use nextflow::NextflowCommandBuilder;

use crate::error::Result;

/// Builds the complete command-line string needed to run a workflow.
pub trait CommandBuilder {
    /// Constructs a shell-compatible command string.
    ///
    /// Pure function of the job configuration; no side effects.
    fn build(&self) -> Result<String>;
}
