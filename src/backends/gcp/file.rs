//! Google Cloud Storage Staging and Executor Configuration
//!
//! [`GcpFileUploader`] copies local artifacts into the per-run staging area:
//! params files and samplesheets land under `.../input/`, everything else
//! under `.../config/`. Pipeline directories are uploaded with a bounded
//! worker pool, preserving paths relative to the directory root.
//!
//! [`GcpExecutorConfigBuilder`] renders the Nextflow executor config from a
//! bundled template plus per-run substitutions and appends a static extras
//! block. Neither component performs any I/O in dry-run mode.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::thread;

use log::{error, info};

use crate::backends::gcp::job::GcpJobConfig;
use crate::backends::gcp::storage::{parse_gcs_path, StorageClient};
use crate::backends::{ExecutorConfigBuilder, FileUploader};
use crate::error::{LaunchError, Result};
use crate::utils::paths::resolve_path;
use crate::utils::templates::render_template;
use crate::utils::upload::{iter_directory_files, relative_paths};

/// Directories never staged when uploading a pipeline directory.
const EXCLUDED_DIRS: &[&str] = &[".git"];

/// GCS implementation of the [`FileUploader`] interface.
pub struct GcpFileUploader<'a> {
    job_config: &'a GcpJobConfig,
    store: &'a dyn StorageClient,
}

impl<'a> GcpFileUploader<'a> {
    pub fn new(job_config: &'a GcpJobConfig, store: &'a dyn StorageClient) -> Self {
        Self { job_config, store }
    }

    /// Computes the `(bucket, object)` destination for a single file.
    ///
    /// Files named by `params_file` or `samplesheet` are classified as
    /// pipeline input; everything else is configuration.
    fn destination(&self, local_path: &str) -> Result<(String, String)> {
        let common = &self.job_config.common;
        let (bucket, prefix) = parse_gcs_path(&format!("gs://{}", common.remote_run_path))?;

        let is_input = [&common.params_file, &common.samplesheet]
            .iter()
            .any(|field| field.as_deref() == Some(local_path));
        let subdirectory = if is_input { "input" } else { "config" };

        let file_name = Path::new(local_path)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                LaunchError::validation(format!("Cannot upload '{}': no file name", local_path))
            })?;

        let object = if prefix.is_empty() {
            format!("{}/{}/{}", common.workflowrun_id, subdirectory, file_name)
        } else {
            format!(
                "{}/{}/{}/{}",
                prefix, common.workflowrun_id, subdirectory, file_name
            )
        };

        Ok((bucket, object))
    }

    /// Destination object prefix for a pipeline directory upload.
    fn directory_prefix(&self, directory_name: &str) -> Result<(String, String)> {
        let common = &self.job_config.common;
        let (bucket, prefix) = parse_gcs_path(&format!("gs://{}", common.remote_run_path))?;

        let object_prefix = if prefix.is_empty() {
            format!("{}/config/{}/", common.workflowrun_id, directory_name)
        } else {
            format!(
                "{}/{}/config/{}/",
                prefix, common.workflowrun_id, directory_name
            )
        };

        Ok((bucket, object_prefix))
    }
}

impl FileUploader for GcpFileUploader<'_> {
    fn upload(&self, local_path: &str) -> Result<()> {
        let (bucket, object) = self.destination(local_path)?;
        let file_path = resolve_path(local_path);

        if self.job_config.common.dry_run {
            info!(
                "[DRY-RUN] Will upload {} to gs://{}/{}",
                file_path.display(),
                bucket,
                object
            );
            return Ok(());
        }

        match self.store.upload_object(&bucket, &object, &file_path) {
            Ok(()) => {
                info!("Uploaded {} to gs://{}/{}", file_path.display(), bucket, object);
                Ok(())
            }
            Err(err) => {
                error!("Failed to access or upload {}: {}", file_path.display(), err);
                Err(err)
            }
        }
    }

    fn upload_directory(&self, directory_path: &str, max_workers: usize) -> Result<()> {
        let directory = resolve_path(directory_path);
        if !directory.is_dir() {
            return Err(LaunchError::io(
                &directory,
                std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found"),
            ));
        }

        let directory_name = directory
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                LaunchError::validation(format!("Invalid pipeline directory: {}", directory_path))
            })?;

        let files = iter_directory_files(&directory, EXCLUDED_DIRS)?;
        let rel_paths = relative_paths(&files, &directory);
        let (bucket, object_prefix) = self.directory_prefix(directory_name)?;

        if self.job_config.common.dry_run {
            info!(
                "[DRY-RUN] Found {} files in {} ready to upload",
                rel_paths.len(),
                directory.display()
            );
            info!(
                "[DRY-RUN] Will upload {} to gs://{}/{}",
                directory.display(),
                bucket,
                object_prefix
            );
            return Ok(());
        }

        // Bounded worker pool; every transfer is attempted before the first
        // failure (if any) is surfaced.
        let workers = max_workers.max(1);
        let queue: Mutex<VecDeque<&std::path::PathBuf>> =
            Mutex::new(rel_paths.iter().collect());
        let failures: Mutex<Vec<(String, LaunchError)>> = Mutex::new(Vec::new());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let next = queue
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .pop_front();
                    let rel = match next {
                        Some(rel) => rel,
                        None => break,
                    };
                    let rel_str = rel.to_string_lossy();
                    let object = format!("{}{}", object_prefix, rel_str);
                    let source = directory.join(rel);

                    if let Err(err) = self.store.upload_object(&bucket, &object, &source) {
                        failures
                            .lock()
                            .unwrap_or_else(std::sync::PoisonError::into_inner)
                            .push((rel_str.into_owned(), err));
                    }
                });
            }
        });

        let mut failures = failures
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some((name, err)) = failures.drain(..).next() {
            error!("Failed to upload {} due to exception: {}", name, err);
            return Err(err);
        }

        info!(
            "Uploaded {} to gs://{}/{}",
            directory.display(),
            bucket,
            object_prefix
        );
        Ok(())
    }
}

/// Bundled template rendered with per-run substitutions.
const CONFIG_TEMPLATE: &str = include_str!("templates/gcp.config.template");

/// Static block appended verbatim after the rendered section.
const EXTRAS_TEMPLATE: &str = include_str!("templates/gcp.extras.template");

/// Generates the Nextflow executor configuration for Google Batch.
pub struct GcpExecutorConfigBuilder<'a> {
    job_config: &'a GcpJobConfig,
}

impl<'a> GcpExecutorConfigBuilder<'a> {
    pub fn new(job_config: &'a GcpJobConfig) -> Self {
        Self { job_config }
    }

    /// Renders the full config text (template plus extras) for the given
    /// timestamp suffix.
    fn render(&self, log_suffix: &str) -> Result<String> {
        let config = self.job_config;
        let common = &config.common;

        let mut labels = config.labels.clone();
        labels.insert("workflowrun_id".to_string(), common.workflowrun_id.clone());
        let resource_labels = labels
            .iter()
            .map(|(k, v)| format!("\"{}\": \"{}\"", k, v))
            .collect::<Vec<_>>()
            .join(", ");

        let rendered = render_template(
            CONFIG_TEMPLATE,
            &[
                ("base_bucket", common.base_bucket.clone()),
                ("remote_run_path", common.remote_run_path.clone()),
                ("workflowrun_id", common.workflowrun_id.clone()),
                ("log_suffix", log_suffix.to_string()),
                ("project_id", config.project_id.clone()),
                ("region", config.region.clone()),
                ("use_private_address", config.use_private_address.to_string()),
                ("spot", config.spot.to_string()),
                ("network", config.network.clone().unwrap_or_default()),
                ("subnetwork", config.subnetwork.clone().unwrap_or_default()),
                ("service_account_email", config.service_account_email.clone()),
                ("resource_labels", resource_labels),
            ],
        )?;

        Ok(format!("{}{}", rendered, EXTRAS_TEMPLATE))
    }
}

impl ExecutorConfigBuilder for GcpExecutorConfigBuilder<'_> {
    fn build(&self) -> Result<()> {
        let target = &self.job_config.common.executor_config_file;
        let log_suffix = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let content = self.render(&log_suffix)?;

        if self.job_config.common.dry_run {
            info!("[DRY-RUN] Will write executor config file {}", target);
            return Ok(());
        }

        std::fs::write(target, content).map_err(|e| LaunchError::io(target, e))?;
        info!("GCP Batch executor config written to: {}", target);
        Ok(())
    }
}
