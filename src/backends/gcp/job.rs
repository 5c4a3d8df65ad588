//! Google Cloud Platform Job Configuration
//!
//! Extends the common job configuration with the fields Google Batch needs
//! (project, region, networking, machine sizing) and applies provider
//! defaults for anything left unset.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::backends::{generate_workflowrun_id, JobConfig};
use crate::cli::LaunchArgs;
use crate::error::Result;

/// GCP-specific job configuration.
#[derive(Debug, Clone, Serialize)]
pub struct GcpJobConfig {
    #[serde(flatten)]
    pub common: JobConfig,

    /// GCP project identifier.
    pub project_id: String,
    /// Region where the Batch job runs.
    pub region: String,
    /// Service account email used by Batch.
    pub service_account_email: String,
    /// VPC network name or resource path.
    pub network: Option<String>,
    /// Subnetwork name or resource path.
    pub subnetwork: Option<String>,
    /// Whether worker VMs get no external IP address.
    pub use_private_address: bool,
    /// Spot vs standard provisioning.
    pub spot: bool,
    /// Resource labels; always carries `workflowrun_id`.
    pub labels: BTreeMap<String, String>,
    /// Parallel workers for directory uploads (0 = CPU count).
    pub upload_max_workers: usize,
    /// Machine type for Batch worker VMs.
    pub machine_type: String,
    /// Requested CPU in millicores.
    pub cpu_milli: u32,
    /// Requested memory in MiB.
    pub memory_mib: u32,
}

impl GcpJobConfig {
    /// Fills provider defaults for any unset optional field.
    pub fn apply_defaults(&mut self) {
        if self.upload_max_workers == 0 {
            self.upload_max_workers = num_cpus::get();
        }
        if self.common.remote_cache_path.is_empty() {
            self.common.remote_cache_path = format!("{}/cache", self.common.base_bucket);
        }
        if self.common.remote_run_path.is_empty() {
            self.common.remote_run_path = format!("{}/run", self.common.base_bucket);
        }
        self.labels.insert(
            "workflowrun_id".to_string(),
            self.common.workflowrun_id.clone(),
        );
        if self.cpu_milli == 0 {
            self.cpu_milli = 2000;
        }
        if self.memory_mib == 0 {
            self.memory_mib = 2000;
        }
        if self.machine_type.is_empty() {
            self.machine_type = "e2-small".to_string();
        }
    }
}

/// Constructs [`GcpJobConfig`] values from validated CLI arguments.
pub struct GcpJobConfigBuilder;

impl GcpJobConfigBuilder {
    /// Builds a fully populated configuration: fills the raw fields from the
    /// arguments, computes the derived fields, then applies GCP defaults.
    pub fn build(args: &LaunchArgs) -> Result<GcpJobConfig> {
        let mut common = JobConfig {
            container_image: args.container_image.clone(),
            backend: args.backend.clone(),
            base_bucket: args.base_bucket.clone(),
            remote_cache_path: args.remote_cache_path.clone().unwrap_or_default(),
            remote_run_path: args.remote_run_path.clone().unwrap_or_default(),
            workflowrun_id: generate_workflowrun_id(),
            pipeline_name: args.pipeline_name.clone(),
            pipeline_version: args.pipeline_version.clone(),
            profile: args.profile.clone(),
            params_file: args.params_file.clone(),
            config_file: args.config_file.clone(),
            executor_config_file: args.executor_config_file.clone().unwrap_or_default(),
            samplesheet: args.samplesheet.clone(),
            nextflow_version: args.nextflow_version.clone(),
            sample_id: args.sample_id.clone().unwrap_or_default(),
            plugin: args.plugin.clone(),
            plugin_options: args.plugin_options.clone().unwrap_or_default(),
            resume: args.resume.clone(),
            dry_run: args.dry_run,
            tmp_dir: Default::default(),
            config_mount_path: Default::default(),
            job_id: String::new(),
        };
        common.derive_fields()?;

        let mut config = GcpJobConfig {
            common,
            project_id: args.project_id.clone(),
            region: args.region.clone(),
            service_account_email: args.service_account_email.clone(),
            network: Some(args.network.clone()),
            subnetwork: Some(args.subnetwork.clone()),
            use_private_address: true,
            spot: args.use_spot(),
            labels: args.labels.clone().unwrap_or_default(),
            upload_max_workers: args.upload_max_workers,
            machine_type: args.machine_type.clone().unwrap_or_default(),
            cpu_milli: args.cpu_milli.unwrap_or(0),
            memory_mib: args.memory_mib.unwrap_or(0),
        };
        config.apply_defaults();

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::gcp_config;

    #[test]
    fn test_defaults_applied_when_unset() {
        let config = gcp_config();

        assert_eq!(config.cpu_milli, 2000);
        assert_eq!(config.memory_mib, 2000);
        assert_eq!(config.machine_type, "e2-small");
        assert_eq!(config.upload_max_workers, num_cpus::get());
    }

    #[test]
    fn test_defaults_keep_explicit_values() {
        let mut config = gcp_config();
        config.cpu_milli = 4000;
        config.memory_mib = 8192;
        config.machine_type = "e2-standard-4".to_string();
        config.upload_max_workers = 2;
        config.apply_defaults();

        assert_eq!(config.cpu_milli, 4000);
        assert_eq!(config.memory_mib, 8192);
        assert_eq!(config.machine_type, "e2-standard-4");
        assert_eq!(config.upload_max_workers, 2);
    }

    #[test]
    fn test_labels_always_carry_workflowrun_id() {
        let mut config = gcp_config();
        config.labels.insert("team".to_string(), "oncology".to_string());
        config.apply_defaults();

        assert_eq!(
            config.labels.get("workflowrun_id"),
            Some(&config.common.workflowrun_id)
        );
        assert_eq!(config.labels.get("team"), Some(&"oncology".to_string()));
    }

    #[test]
    fn test_remote_paths_default_to_base_bucket() {
        let mut config = gcp_config();
        config.common.remote_cache_path = String::new();
        config.common.remote_run_path = String::new();
        config.apply_defaults();

        assert_eq!(config.common.remote_cache_path, "my-bucket/cache");
        assert_eq!(config.common.remote_run_path, "my-bucket/run");
    }

    #[test]
    fn test_config_serializes_flat_for_debug_dump() {
        let config = gcp_config();
        let dump = serde_json::to_value(&config).unwrap();

        // Common and provider fields live side by side in the dump
        assert_eq!(dump["backend"], "google-batch");
        assert_eq!(dump["project_id"], "my-project");
        assert_eq!(dump["machine_type"], "e2-small");
        assert!(dump["workflowrun_id"].is_string());
    }
}
