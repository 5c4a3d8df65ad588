//! Backend Abstractions
//!
//! Common job configuration plus the capability traits every cloud backend
//! implements:
//!
//! - [`BatchClient`]: stage resources, launch, and cancel a batch job
//! - [`FileUploader`]: copy local files/directories to object storage
//! - [`ExecutorConfigBuilder`]: render the engine's executor config file
//!
//! Exactly one implementation set is selected at run time by backend name
//! (see [`crate::registry`]); adding a provider means adding one more
//! implementation set and one registry entry.

pub mod gcp;

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::utils::paths::{ensure_directory, resolve_path};

/// Filesystem path inside the runner container where configs are mounted.
pub const CONFIG_MOUNT_PATH: &str = "/etc/nextflow";

/// Generates a Nextflow-compatible run identifier.
///
/// Nextflow run names must start with a lowercase letter, so the first UUID
/// character is replaced with one derived from the UUID's own entropy.
pub fn generate_workflowrun_id() -> String {
    let uuid = Uuid::new_v4();
    let letter = (b'a' + (uuid.as_bytes()[0] % 26)) as char;
    let text = uuid.to_string();
    format!("{}{}", letter, &text[1..])
}

/// Lifecycle of a batch client.
///
/// `Created -> Staged -> Launched` on success; any unrecovered error leaves
/// the client at `Failed`. `Cancelled` is only reachable from `Launched`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClientState {
    Created,
    Staged,
    Launched,
    Failed,
    Cancelled,
}

/// Runtime context shared with backend implementations.
///
/// A read-only derived view of the job configuration so business logic does
/// not need to reach into configuration internals.
#[derive(Debug, Clone)]
pub struct BackendContext {
    /// Directory where temporary artifacts are staged prior to upload.
    pub tmp_dir: PathBuf,
    /// Path inside the runner container where configs mount.
    pub config_mount_path: PathBuf,
    /// Unique identifier for the Nextflow run.
    pub workflowrun_id: String,
    /// Cloud provider identifier for the runner job.
    pub job_id: String,
}

/// Narrow mutation surface for plugins.
///
/// Plugins may rewrite derived input paths but never identity fields; the
/// samplesheet is the single field they are allowed to patch.
#[derive(Debug, Clone, Default)]
pub struct ConfigPatch {
    pub samplesheet: Option<String>,
}

/// Job configuration shared across all cloud providers.
///
/// Constructed once per run from validated CLI arguments; immutable
/// afterwards except through [`JobConfig::apply_patch`].
#[derive(Debug, Clone, Serialize)]
pub struct JobConfig {
    pub container_image: String,
    pub backend: String,
    pub base_bucket: String,
    pub remote_cache_path: String,
    pub remote_run_path: String,
    pub workflowrun_id: String,
    pub pipeline_name: String,
    pub pipeline_version: Option<String>,
    pub profile: Option<String>,
    pub params_file: Option<String>,
    pub config_file: Option<String>,
    pub executor_config_file: String,
    pub samplesheet: Option<String>,
    pub nextflow_version: String,
    pub sample_id: String,
    pub plugin: Option<String>,
    pub plugin_options: BTreeMap<String, Value>,
    pub resume: Option<String>,
    pub dry_run: bool,
    pub tmp_dir: PathBuf,
    pub config_mount_path: PathBuf,
    pub job_id: String,
}

impl JobConfig {
    /// Computes the derived fields after the raw fields have been filled in.
    ///
    /// Performed once at construction time:
    /// - creates the per-run temporary directory under
    ///   `NF_LAUNCH_TMPDIR`, `TMPDIR`, or `.tmp`
    /// - defaults `sample_id` to the last 8 characters of the run id
    /// - derives `job_id` from the sample id and the first 8 characters of
    ///   the run id
    /// - defaults `executor_config_file` to `<tmp_dir>/gcp.config`
    /// - rewrites `pipeline_name` to its absolute form when it points at an
    ///   existing local path (one-time normalization)
    pub fn derive_fields(&mut self) -> Result<()> {
        let base_tmp = env::var("NF_LAUNCH_TMPDIR")
            .or_else(|_| env::var("TMPDIR"))
            .unwrap_or_else(|_| ".tmp".to_string());
        let tmp_dir = ensure_directory(&resolve_path(&base_tmp).join(&self.workflowrun_id))?;
        self.tmp_dir = tmp_dir.clone();

        self.config_mount_path = PathBuf::from(CONFIG_MOUNT_PATH);

        if self.sample_id.is_empty() {
            let id = &self.workflowrun_id;
            self.sample_id = id[id.len().saturating_sub(8)..].to_string();
        }
        self.job_id = format!(
            "nf-runner-{}-{}",
            self.sample_id.replace(',', "-").to_lowercase(),
            &self.workflowrun_id[..8]
        );

        if self.executor_config_file.is_empty() {
            self.executor_config_file = tmp_dir.join("gcp.config").display().to_string();
        } else {
            self.executor_config_file =
                resolve_path(&self.executor_config_file).display().to_string();
        }

        let candidate = self.pipeline_name.trim().to_string();
        let pipeline_path = resolve_path(&candidate);
        if pipeline_path.exists() {
            self.pipeline_name = pipeline_path.display().to_string();
        } else {
            self.pipeline_name = candidate;
        }

        Ok(())
    }

    /// Applies a plugin-produced patch. Identity fields are untouchable.
    pub fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(samplesheet) = patch.samplesheet {
            self.samplesheet = Some(samplesheet);
        }
    }

    /// Returns the read-only context handed to backend implementations.
    pub fn context(&self) -> BackendContext {
        BackendContext {
            tmp_dir: self.tmp_dir.clone(),
            config_mount_path: self.config_mount_path.clone(),
            workflowrun_id: self.workflowrun_id.clone(),
            job_id: self.job_id.clone(),
        }
    }
}

/// Interface for submitting jobs to a cloud batch service.
pub trait BatchClient {
    /// Stages input files and configuration artifacts to cloud storage.
    ///
    /// Transitions `Created -> Staged`; any uploader failure leaves the
    /// client at `Failed` and propagates the error.
    fn stage_resources(&mut self) -> Result<()>;

    /// Submits the job to the target batch system, or emits the dry-run
    /// artifact without any network call when dry-run is enabled.
    ///
    /// Transitions `Staged -> Launched` on success.
    fn launch_job(&mut self) -> Result<()>;

    /// Terminates an active job. Backends without cancel support must fail
    /// loudly with [`crate::error::LaunchError::Unsupported`].
    fn cancel_job(&mut self) -> Result<()>;

    /// Current lifecycle state of the client.
    fn state(&self) -> ClientState;
}

/// Interface for uploading files required by the pipeline.
pub trait FileUploader {
    /// Uploads a single file to the staging area derived from the job config.
    fn upload(&self, local_path: &str) -> Result<()>;

    /// Uploads an entire local pipeline directory, bounded by `max_workers`
    /// parallel transfers.
    fn upload_directory(&self, directory_path: &str, max_workers: usize) -> Result<()>;
}

/// Interface for generating the executor configuration consumed by the
/// workflow engine via its `-c` inclusion flag.
pub trait ExecutorConfigBuilder {
    /// Renders the provider config file into the temporary workspace.
    fn build(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::base_config;

    #[test]
    fn test_workflowrun_id_starts_with_lowercase_letter() {
        for _ in 0..50 {
            let id = generate_workflowrun_id();
            let first = id.chars().next().unwrap();
            assert!(first.is_ascii_lowercase() && first.is_ascii_alphabetic());
            assert_eq!(id.len(), 36);
        }
    }

    #[test]
    fn test_workflowrun_ids_are_unique() {
        let a = generate_workflowrun_id();
        let b = generate_workflowrun_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_job_id_is_deterministic() {
        let mut config = base_config();
        config.workflowrun_id = "abcdef12-3456-7890-abcd-ef1234567890".to_string();
        config.sample_id = "SAMPLE01".to_string();
        config.derive_fields().unwrap();

        assert_eq!(config.job_id, "nf-runner-sample01-abcdef12");

        // Re-deriving with the same inputs yields the same string
        let mut again = base_config();
        again.workflowrun_id = "abcdef12-3456-7890-abcd-ef1234567890".to_string();
        again.sample_id = "SAMPLE01".to_string();
        again.derive_fields().unwrap();
        assert_eq!(config.job_id, again.job_id);
    }

    #[test]
    fn test_job_id_replaces_commas() {
        let mut config = base_config();
        config.workflowrun_id = "abcdef12-3456-7890-abcd-ef1234567890".to_string();
        config.sample_id = "TUMOR,NORMAL".to_string();
        config.derive_fields().unwrap();

        assert_eq!(config.job_id, "nf-runner-tumor-normal-abcdef12");
    }

    #[test]
    fn test_sample_id_defaults_to_run_id_suffix() {
        let mut config = base_config();
        config.workflowrun_id = "abcdef12-3456-7890-abcd-ef1234567890".to_string();
        config.derive_fields().unwrap();

        assert_eq!(config.sample_id, "34567890");
    }

    #[test]
    fn test_executor_config_defaults_to_tmp_dir() {
        let mut config = base_config();
        config.derive_fields().unwrap();

        assert!(config.executor_config_file.ends_with("gcp.config"));
        assert!(config.executor_config_file.contains(&config.workflowrun_id));
    }

    #[test]
    fn test_local_pipeline_path_is_canonicalized() {
        let mut config = base_config();
        config.derive_fields().unwrap();

        let pipeline = config.tmp_dir.join("pipeline");
        std::fs::create_dir_all(&pipeline).unwrap();
        config.pipeline_name = pipeline.display().to_string();
        config.derive_fields().unwrap();

        let resolved = config.pipeline_name.clone();
        assert!(PathBuf::from(&resolved).is_absolute());

        // Idempotent: resolving twice yields the same string
        config.pipeline_name = resolved.clone();
        config.derive_fields().unwrap();
        assert_eq!(config.pipeline_name, resolved);
    }

    #[test]
    fn test_remote_pipeline_reference_untouched() {
        let mut config = base_config();
        config.pipeline_name = " nf-core/sarek ".to_string();
        config.derive_fields().unwrap();

        assert_eq!(config.pipeline_name, "nf-core/sarek");
    }

    #[test]
    fn test_tmp_dir_is_per_run() {
        let mut config = base_config();
        config.derive_fields().unwrap();

        assert!(config.tmp_dir.is_dir());
        assert!(config.tmp_dir.ends_with(&config.workflowrun_id));
    }

    #[test]
    fn test_apply_patch_only_touches_samplesheet() {
        let mut config = base_config();
        config.derive_fields().unwrap();

        let run_id = config.workflowrun_id.clone();
        let job_id = config.job_id.clone();

        config.apply_patch(ConfigPatch {
            samplesheet: Some("/tmp/samplesheet.csv".to_string()),
        });

        assert_eq!(config.samplesheet.as_deref(), Some("/tmp/samplesheet.csv"));
        assert_eq!(config.workflowrun_id, run_id);
        assert_eq!(config.job_id, job_id);

        // Empty patch is a no-op
        config.apply_patch(ConfigPatch::default());
        assert_eq!(config.samplesheet.as_deref(), Some("/tmp/samplesheet.csv"));
    }

    #[test]
    fn test_context_mirrors_config() {
        let mut config = base_config();
        config.derive_fields().unwrap();

        let context = config.context();
        assert_eq!(context.workflowrun_id, config.workflowrun_id);
        assert_eq!(context.job_id, config.job_id);
        assert_eq!(context.tmp_dir, config.tmp_dir);
        assert_eq!(context.config_mount_path, PathBuf::from(CONFIG_MOUNT_PATH));
    }
}
