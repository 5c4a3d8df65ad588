//! Nextflow Launcher
//!
//! Orchestrates a single run from validated CLI arguments: resolve the
//! backend, build and dump the job configuration, apply the selected plugin
//! patch, then stage resources and submit the job.

use log::info;

use crate::backends::gcp::storage::GcsClient;
use crate::backends::gcp::{GcpBatchClient, GcpJobConfig, GcpJobConfigBuilder};
use crate::backends::BatchClient;
use crate::cli::LaunchArgs;
use crate::error::{LaunchError, Result};
use crate::registry::{self, BackendKind};

/// Launches a Nextflow pipeline on the configured cloud backend.
pub struct NextflowLauncher {
    args: LaunchArgs,
}

impl NextflowLauncher {
    pub fn new(args: LaunchArgs) -> Self {
        Self { args }
    }

    /// Runs the full launch flow. Dry-run mode performs every local step but
    /// stops before any network call.
    pub fn run(&self) -> Result<()> {
        info!("Starting Nextflow Launcher ...");

        match registry::resolve_backend(&self.args.backend)? {
            BackendKind::GoogleBatch => {
                let job_config = self.prepare_google_batch()?;
                let mut client = GcpBatchClient::new(job_config);
                client.stage_resources()?;
                client.launch_job()
            }
        }
    }

    /// Builds the GCP job configuration, dumps it for inspection, and
    /// applies the plugin patch when a plugin is selected.
    pub(crate) fn prepare_google_batch(&self) -> Result<GcpJobConfig> {
        let mut job_config = GcpJobConfigBuilder::build(&self.args)?;

        let job_config_file = job_config.common.tmp_dir.join("job_config.json");
        let dump = serde_json::to_string_pretty(&job_config)
            .map_err(|e| LaunchError::Validation(format!("failed to serialize job config: {}", e)))?;
        std::fs::write(&job_config_file, dump)
            .map_err(|e| LaunchError::io(&job_config_file, e))?;
        info!("Job config loaded from args: {}", job_config_file.display());

        if let Some(plugin_name) = job_config.common.plugin.clone() {
            let plugin = registry::resolve_plugin(&plugin_name)?;
            let store = GcsClient::new();
            let patch = plugin.load(&job_config.common, &store)?;
            job_config.common.apply_patch(patch);
        }

        Ok(job_config)
    }
}
