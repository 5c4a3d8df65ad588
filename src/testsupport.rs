//! Shared Test Fixtures
//!
//! Compiled only for tests. Provides a process-lifetime temporary root for
//! per-run directories and an in-memory [`StorageClient`] double that records
//! every transfer instead of touching the network.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

use crate::backends::gcp::job::GcpJobConfig;
use crate::backends::gcp::storage::{ObjectMeta, StorageClient};
use crate::backends::{generate_workflowrun_id, JobConfig};
use crate::error::{LaunchError, Result};

/// One temporary root for the whole test process. Never dropped, so per-run
/// directories created under it stay valid across threads.
static TEST_TMP: Lazy<tempfile::TempDir> = Lazy::new(|| {
    let dir = tempfile::tempdir().expect("failed to create test tmp root");
    std::env::set_var("NF_LAUNCH_TMPDIR", dir.path());
    dir
});

/// Forces the shared temporary root so per-run directories land under it.
pub(crate) fn init_tmp_root() {
    Lazy::force(&TEST_TMP);
}

/// Common job configuration with raw fields filled and derived fields empty.
/// Call `derive_fields()` to finalize.
pub(crate) fn base_config() -> JobConfig {
    init_tmp_root();
    JobConfig {
        container_image: "nextflow/nextflow".to_string(),
        backend: "google-batch".to_string(),
        base_bucket: "my-bucket".to_string(),
        remote_cache_path: "my-bucket/cache".to_string(),
        remote_run_path: "my-bucket/run".to_string(),
        workflowrun_id: generate_workflowrun_id(),
        pipeline_name: "nf-core/rnaseq".to_string(),
        pipeline_version: Some("3.14.0".to_string()),
        profile: None,
        params_file: None,
        config_file: None,
        executor_config_file: String::new(),
        samplesheet: None,
        nextflow_version: "25.04.6".to_string(),
        sample_id: String::new(),
        plugin: None,
        plugin_options: BTreeMap::new(),
        resume: None,
        dry_run: false,
        tmp_dir: PathBuf::new(),
        config_mount_path: PathBuf::new(),
        job_id: String::new(),
    }
}

/// Fully derived GCP job configuration with provider defaults applied.
pub(crate) fn gcp_config() -> GcpJobConfig {
    let mut common = base_config();
    common.derive_fields().expect("derive_fields failed");
    let mut config = GcpJobConfig {
        common,
        project_id: "my-project".to_string(),
        region: "europe-west4".to_string(),
        service_account_email: "runner@my-project.iam.gserviceaccount.com".to_string(),
        network: None,
        subnetwork: None,
        use_private_address: true,
        spot: true,
        labels: BTreeMap::new(),
        upload_max_workers: 0,
        machine_type: String::new(),
        cpu_milli: 0,
        memory_mib: 0,
    };
    config.apply_defaults();
    config
}

/// Recorded single-object transfer: `(bucket, object, local path)`.
pub(crate) type RecordedUpload = (String, String, PathBuf);

/// In-memory storage double. Records uploads, serves canned listings, and
/// optionally fails transfers whose object name contains `fail_on`.
#[derive(Default)]
pub(crate) struct MemoryStorage {
    pub uploads: Mutex<Vec<RecordedUpload>>,
    pub objects: Vec<ObjectMeta>,
    pub fail_on: Option<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(objects: Vec<ObjectMeta>) -> Self {
        Self {
            objects,
            ..Self::default()
        }
    }

    pub fn failing_on(pattern: &str) -> Self {
        Self {
            fail_on: Some(pattern.to_string()),
            ..Self::default()
        }
    }

    pub fn recorded(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

impl StorageClient for MemoryStorage {
    fn upload_object(&self, bucket: &str, object: &str, local_path: &std::path::Path) -> Result<()> {
        if let Some(pattern) = &self.fail_on {
            if object.contains(pattern.as_str()) {
                return Err(LaunchError::Remote(format!(
                    "injected failure uploading '{}'",
                    object
                )));
            }
        }
        self.uploads
            .lock()
            .unwrap()
            .push((bucket.to_string(), object.to_string(), local_path.to_path_buf()));
        Ok(())
    }

    fn list_objects(&self, _bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>> {
        Ok(self
            .objects
            .iter()
            .filter(|o| o.name.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Builds an [`ObjectMeta`] with the given update timestamp.
pub(crate) fn object_meta(name: &str, updated: &str) -> ObjectMeta {
    ObjectMeta {
        name: name.to_string(),
        updated: updated.parse::<DateTime<Utc>>().expect("bad timestamp"),
    }
}
