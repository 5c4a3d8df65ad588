//! Command-Line Interface
//!
//! Argument definitions and the validators/normalizers applied while
//! parsing: bucket names lose their `gs://` scheme, backend aliases collapse
//! to canonical names, service account emails are checked against the
//! user-managed pattern, and local path arguments must exist and are
//! returned in absolute form.

use std::collections::BTreeMap;

use clap::{ArgAction, Parser};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::utils::paths::resolve_path;

/// User-managed service account pattern: name@PROJECT_ID.iam.gserviceaccount.com
static GSA_USER_MANAGED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9-]*@[a-z][a-z0-9-]*\.iam\.gserviceaccount\.com$")
        .unwrap()
});

/// Run your Nextflow pipelines in the cloud, effortlessly
#[derive(Parser, Debug, Clone)]
#[command(
    name = "nflaunch",
    version,
    about = "Run your Nextflow pipelines in the cloud, effortlessly",
    arg_required_else_help = true,
    disable_help_subcommand = true
)]
pub struct LaunchArgs {
    /// Cloud storage bucket used for configs, logs, cache, and work
    /// directories (e.g., gs://my-bucket or my-bucket).
    #[arg(short = 'b', long, value_parser = parse_bucket_name, help_heading = "General options")]
    pub base_bucket: String,

    /// Docker image that contains Nextflow and any required dependencies.
    #[arg(
        short = 'i',
        long,
        default_value = "nextflow/nextflow",
        help_heading = "General options"
    )]
    pub container_image: String,

    /// Identifier for the input sample(s) to be processed.
    #[arg(short = 's', long, help_heading = "General options")]
    pub sample_id: Option<String>,

    /// Print job configuration without submitting it to the cloud backend.
    #[arg(short = 'd', long, help_heading = "General options")]
    pub dry_run: bool,

    /// Batch processing backend to use. Currently only 'google-batch' is
    /// supported (alias: 'gcp-batch').
    #[arg(
        short = 'e',
        long,
        default_value = "google-batch",
        value_parser = parse_backend_alias,
        help_heading = "General options"
    )]
    pub backend: String,

    /// Remote GCS path for the Nextflow cache directory. Defaults to
    /// 'BASE_BUCKET/cache' when omitted.
    #[arg(short = 'c', long, help_heading = "General options")]
    pub remote_cache_path: Option<String>,

    /// Remote GCS path where config files and Nextflow report/trace/timeline
    /// are stored. Defaults to 'BASE_BUCKET/run' when omitted.
    #[arg(short = 'r', long, help_heading = "General options")]
    pub remote_run_path: Option<String>,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short = 'v', long, action = ArgAction::Count, help_heading = "General options")]
    pub verbose: u8,

    /// Google Cloud project ID.
    #[arg(long, help_heading = "GCP Batch options")]
    pub project_id: String,

    /// Google Cloud region in which to run the Batch job.
    #[arg(long, help_heading = "GCP Batch options")]
    pub region: String,

    /// Service account email with permissions to launch Batch jobs and
    /// access Google Cloud Storage.
    #[arg(long, value_parser = parse_sa_email, help_heading = "GCP Batch options")]
    pub service_account_email: String,

    /// VPC network name to attach to the VM (required for shared VPCs).
    #[arg(long, help_heading = "GCP Batch options")]
    pub network: String,

    /// Subnetwork name to attach to the VM (required for shared VPCs).
    #[arg(long, help_heading = "GCP Batch options")]
    pub subnetwork: String,

    /// Use Spot instances (the default provisioning model).
    #[arg(long, help_heading = "GCP Batch options")]
    spot: bool,

    /// Use standard provisioning instead of Spot instances.
    #[arg(long, conflicts_with = "spot", help_heading = "GCP Batch options")]
    no_spot: bool,

    /// JSON object of labels for the Nextflow runner
    /// (e.g., '{"team":"oncology"}').
    #[arg(long, value_parser = parse_label_map, help_heading = "GCP Batch options")]
    pub labels: Option<BTreeMap<String, String>>,

    /// Max parallel workers for uploading pipeline directories to GCS. Use 0
    /// for automatic CPU-count detection.
    #[arg(long, default_value_t = 0, help_heading = "GCP Batch options")]
    pub upload_max_workers: usize,

    /// Requested CPU for the Batch task in millicores (e.g., 4000 for 4 vCPU).
    #[arg(long, value_parser = parse_positive_u32, help_heading = "GCP Batch options")]
    pub cpu_milli: Option<u32>,

    /// Requested memory for the Batch task in MiB (e.g., 8192 for 8 GiB).
    #[arg(long, value_parser = parse_positive_u32, help_heading = "GCP Batch options")]
    pub memory_mib: Option<u32>,

    /// Machine type for Batch worker VMs (e.g., e2-standard-4). Defaults to
    /// the provider recommended type.
    #[arg(long, help_heading = "GCP Batch options")]
    pub machine_type: Option<String>,

    /// Pipeline name (GitHub-style like 'nf-core/rnaseq'), local folder path
    /// (e.g., '/path/to/pipeline'), or '.' for the current directory.
    #[arg(long, help_heading = "Nextflow options")]
    pub pipeline_name: String,

    /// Version of Nextflow to use (e.g., 25.04.6).
    #[arg(long, default_value = "25.04.6", help_heading = "Nextflow options")]
    pub nextflow_version: String,

    /// Specific version/tag of the pipeline to run.
    #[arg(long, help_heading = "Nextflow options")]
    pub pipeline_version: Option<String>,

    /// Profile defined in the Nextflow config file.
    #[arg(long, help_heading = "Nextflow options")]
    pub profile: Option<String>,

    /// Path to a YAML/JSON file containing pipeline parameters.
    #[arg(long, value_parser = parse_existing_path, help_heading = "Nextflow options")]
    pub params_file: Option<String>,

    /// Path to a custom Nextflow configuration file.
    #[arg(long, value_parser = parse_existing_path, help_heading = "Nextflow options")]
    pub config_file: Option<String>,

    /// Path to the Nextflow cloud executor configuration file.
    #[arg(long, value_parser = parse_existing_path, help_heading = "Nextflow options")]
    pub executor_config_file: Option<String>,

    /// Path to the input CSV samplesheet used by the pipeline.
    #[arg(long, value_parser = parse_existing_path, help_heading = "Nextflow options")]
    pub samplesheet: Option<String>,

    /// Resume a previous pipeline execution.
    /// Format: WORKFLOWRUN_ID,WORKFLOW_SESSION.
    #[arg(long, help_heading = "Nextflow options")]
    pub resume: Option<String>,

    /// Plugin name to be added to the backend options.
    #[arg(short = 'p', long, help_heading = "Plugin options")]
    pub plugin: Option<String>,

    /// JSON object of plugin options for the selected plugin
    /// (e.g., '{"sample_group": "clinical"}').
    #[arg(short = 'o', long, value_parser = parse_json_object, help_heading = "Plugin options")]
    pub plugin_options: Option<BTreeMap<String, Value>>,
}

impl LaunchArgs {
    /// Spot provisioning is the default; `--no-spot` disables it.
    pub fn use_spot(&self) -> bool {
        !self.no_spot
    }
}

/// Accepts `my-bucket` or `gs://my-bucket` and returns `my-bucket`.
fn parse_bucket_name(value: &str) -> Result<String, String> {
    let bucket = value.rsplit('/').next().unwrap_or("");
    if bucket.is_empty() {
        return Err("Base bucket cannot be empty.".to_string());
    }
    Ok(bucket.to_string())
}

/// Normalizes backend aliases to the canonical backend name.
fn parse_backend_alias(value: &str) -> Result<String, String> {
    match value.to_lowercase().as_str() {
        "google-batch" | "gcp-batch" => Ok("google-batch".to_string()),
        _ => Err("Backend must be 'google-batch' (alias: 'gcp-batch').".to_string()),
    }
}

fn parse_sa_email(value: &str) -> Result<String, String> {
    if GSA_USER_MANAGED_RE.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(
            "Invalid service account email. Expected 'name@PROJECT_ID.iam.gserviceaccount.com'"
                .to_string(),
        )
    }
}

fn parse_positive_u32(value: &str) -> Result<u32, String> {
    let n: i64 = value
        .parse()
        .map_err(|_| format!("Expected a positive integer, got: '{}'", value))?;
    if n <= 0 {
        return Err("Value must be greater than zero.".to_string());
    }
    u32::try_from(n).map_err(|_| format!("Value out of range: '{}'", value))
}

/// Validates that a path argument exists and returns it in absolute form.
fn parse_existing_path(value: &str) -> Result<String, String> {
    let path = resolve_path(value.trim());
    if !path.exists() {
        return Err(format!("Path does not exist: {}", value.trim()));
    }
    Ok(path.display().to_string())
}

fn parse_json_object(value: &str) -> Result<BTreeMap<String, Value>, String> {
    let parsed: Value =
        serde_json::from_str(value).map_err(|e| format!("Invalid JSON: {}", e))?;
    match parsed {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Err("Expected a JSON object (e.g., '{\"key\": \"value\"}').".to_string()),
    }
}

/// Like [`parse_json_object`] but every value must be a string.
fn parse_label_map(value: &str) -> Result<BTreeMap<String, String>, String> {
    parse_json_object(value)?
        .into_iter()
        .map(|(k, v)| match v {
            Value::String(s) => Ok((k, s)),
            _ => Err(format!("Label '{}' must have a string value.", k)),
        })
        .collect()
}
