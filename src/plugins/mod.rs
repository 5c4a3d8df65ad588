//! Launch Plugins
//!
//! Plugins prepare run inputs that are too pipeline-specific for the core
//! launcher, such as generating a samplesheet from remote assets. A plugin
//! reads the job configuration and returns a [`ConfigPatch`]; it never
//! mutates the configuration directly, so the launcher stays in control of
//! what may change.

pub mod oncoanalyser;

pub use oncoanalyser::OncoanalyserPlugin;

use crate::backends::gcp::storage::StorageClient;
use crate::backends::{ConfigPatch, JobConfig};
use crate::error::Result;

/// Interface for plugins that augment the job configuration before staging.
pub trait Plugin: std::fmt::Debug {
    /// Prepares plugin resources and returns the resulting configuration
    /// patch. `store` provides object-storage access for plugins that need
    /// to resolve remote assets.
    fn load(&self, job_config: &JobConfig, store: &dyn StorageClient) -> Result<ConfigPatch>;
}
