//! nflaunch - Cloud Launcher for Nextflow Pipelines
//!
//! Packages a Nextflow invocation into a cloud batch job: stages input and
//! configuration files to object storage, renders the executor config for
//! the target provider, assembles the `nextflow run` command line, and
//! submits the job request. Designed for teams that want one reproducible
//! command instead of a page of gcloud incantations.
//!
//! # Architecture
//!
//! - [`cli`]: argument definitions, validators, and normalizers
//! - [`launcher`]: orchestration of one run from arguments to submission
//! - [`backends`]: job configuration and the provider capability traits,
//!   with the Google Cloud implementation under [`backends::gcp`]
//! - [`command`]: workflow engine command-line assembly
//! - [`plugins`]: optional input preparation (samplesheet generation)
//! - [`registry`]: name-based backend and plugin resolution
//!
//! # Example
//!
//! ```rust,no_run
//! use clap::Parser;
//! use nflaunch::cli::LaunchArgs;
//! use nflaunch::launcher::NextflowLauncher;
//!
//! fn main() -> Result<(), nflaunch::error::LaunchError> {
//!     let args = LaunchArgs::parse();
//!     NextflowLauncher::new(args).run()
//! }
//! ```

pub mod backends;
pub mod cli;
pub mod command;
pub mod error;
pub mod launcher;
pub mod plugins;
pub mod registry;
pub mod utils;

#[cfg(test)]
pub(crate) mod testsupport;

// Re-export commonly used types
pub use backends::{BatchClient, ClientState, JobConfig};
pub use cli::LaunchArgs;
pub use error::{LaunchError, Result};
pub use launcher::NextflowLauncher;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "nflaunch";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "nflaunch");
    }

    #[test]
    fn test_version_format() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
        for part in parts {
            assert!(part.parse::<u32>().is_ok(), "Version components should be numeric");
        }
    }
}
