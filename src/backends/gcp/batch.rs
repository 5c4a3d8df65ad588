//! Google Cloud Batch Client
//!
//! Stages run artifacts to GCS and submits the runner job to the Batch v1
//! REST API. The request body mirrors the `batch_v1` resource model: one
//! task group with a single container runnable, a GCS volume mounting the
//! staged run directory, and an allocation policy carrying machine type,
//! provisioning model, networking, and service account.
//!
//! In dry-run mode the assembled request is written to
//! `<tmp_dir>/job_request.txt` and no network call is made.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use log::info;
use serde::Serialize;

use crate::backends::gcp::file::{GcpExecutorConfigBuilder, GcpFileUploader};
use crate::backends::gcp::job::GcpJobConfig;
use crate::backends::gcp::storage::{fetch_access_token, GcsClient, StorageClient};
use crate::backends::{
    BackendContext, BatchClient, ClientState, ExecutorConfigBuilder, FileUploader,
};
use crate::command::{CommandBuilder, NextflowCommandBuilder};
use crate::error::{LaunchError, Result};

const BATCH_ENDPOINT: &str = "https://batch.googleapis.com/v1";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Gcs {
    remote_path: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    gcs: Gcs,
    mount_path: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Container {
    image_uri: String,
    entrypoint: String,
    commands: Vec<String>,
}

#[derive(Serialize)]
struct Runnable {
    container: Container,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComputeResource {
    cpu_milli: u32,
    memory_mib: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskSpec {
    runnables: Vec<Runnable>,
    volumes: Vec<Volume>,
    compute_resource: ComputeResource,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskGroup {
    task_count: u32,
    task_spec: TaskSpec,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InstancePolicy {
    machine_type: String,
    provisioning_model: &'static str,
}

#[derive(Serialize)]
struct InstancePolicyOrTemplate {
    policy: InstancePolicy,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NetworkInterface {
    no_external_ip_address: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subnetwork: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NetworkPolicy {
    network_interfaces: Vec<NetworkInterface>,
}

#[derive(Serialize)]
struct ServiceAccount {
    email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AllocationPolicy {
    instances: Vec<InstancePolicyOrTemplate>,
    network: NetworkPolicy,
    service_account: ServiceAccount,
}

#[derive(Serialize)]
struct LogsPolicy {
    destination: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    task_groups: Vec<TaskGroup>,
    allocation_policy: AllocationPolicy,
    logs_policy: LogsPolicy,
    labels: BTreeMap<String, String>,
}

/// Request as written to the dry-run artifact; the live submission posts
/// only the `job` body and carries `parent`/`job_id` in the URL.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateJobRequest {
    parent: String,
    job_id: String,
    job: Job,
}

/// Submits [`GcpJobConfig`] executions to Google Cloud Batch.
pub struct GcpBatchClient {
    job_config: GcpJobConfig,
    context: BackendContext,
    store: Arc<dyn StorageClient>,
    http: reqwest::blocking::Client,
    state: ClientState,
}

impl GcpBatchClient {
    pub fn new(job_config: GcpJobConfig) -> Self {
        Self::with_store(job_config, Arc::new(GcsClient::new()))
    }

    pub(crate) fn with_store(job_config: GcpJobConfig, store: Arc<dyn StorageClient>) -> Self {
        let context = job_config.common.context();
        Self {
            job_config,
            context,
            store,
            http: reqwest::blocking::Client::new(),
            state: ClientState::Created,
        }
    }

    fn stage_inner(&self) -> Result<()> {
        let config = &self.job_config;
        let common = &config.common;

        GcpExecutorConfigBuilder::new(config).build()?;

        let uploader = GcpFileUploader::new(config, self.store.as_ref());

        let single_files = [
            common.config_file.as_deref(),
            common.params_file.as_deref(),
            common.samplesheet.as_deref(),
            Some(common.executor_config_file.as_str()),
        ];
        for local_file in single_files.into_iter().flatten() {
            uploader.upload(local_file)?;
        }

        if common.pipeline_name.ends_with(".nf") && !Path::new(&common.pipeline_name).is_dir() {
            uploader.upload(&common.pipeline_name)?;
        }

        if Path::new(&common.pipeline_name).is_dir() {
            uploader.upload_directory(&common.pipeline_name, config.upload_max_workers)?;
        }

        Ok(())
    }

    /// Assembles the full Batch create-job request for this configuration.
    fn build_request(&self) -> Result<CreateJobRequest> {
        let config = &self.job_config;
        let common = &config.common;

        let gcs_volume = Volume {
            gcs: Gcs {
                remote_path: format!("{}/{}", common.remote_run_path, common.workflowrun_id),
            },
            mount_path: self.context.config_mount_path.display().to_string(),
        };

        let nxf_cmd = NextflowCommandBuilder::new(common).build()?;

        let mut image_uri = common.container_image.clone();
        if !image_uri.contains(':') {
            image_uri = format!("{}:{}", image_uri, common.nextflow_version);
        }

        let runnable = Runnable {
            container: Container {
                image_uri,
                entrypoint: "/bin/bash".to_string(),
                commands: vec!["-c".to_string(), nxf_cmd],
            },
        };

        let task_group = TaskGroup {
            task_count: 1,
            task_spec: TaskSpec {
                runnables: vec![runnable],
                volumes: vec![gcs_volume],
                compute_resource: ComputeResource {
                    cpu_milli: config.cpu_milli,
                    memory_mib: config.memory_mib,
                },
            },
        };

        let allocation_policy = AllocationPolicy {
            instances: vec![InstancePolicyOrTemplate {
                policy: InstancePolicy {
                    machine_type: config.machine_type.clone(),
                    provisioning_model: if config.spot { "SPOT" } else { "STANDARD" },
                },
            }],
            network: NetworkPolicy {
                network_interfaces: vec![NetworkInterface {
                    no_external_ip_address: config.use_private_address,
                    network: config.network.clone(),
                    subnetwork: config.subnetwork.clone(),
                }],
            },
            service_account: ServiceAccount {
                email: config.service_account_email.clone(),
            },
        };

        Ok(CreateJobRequest {
            parent: format!(
                "projects/{}/locations/{}",
                config.project_id, config.region
            ),
            job_id: self.context.job_id.clone(),
            job: Job {
                task_groups: vec![task_group],
                allocation_policy,
                logs_policy: LogsPolicy {
                    destination: "CLOUD_LOGGING",
                },
                labels: config.labels.clone(),
            },
        })
    }

    fn launch_inner(&self) -> Result<()> {
        let config = &self.job_config;
        let request = self.build_request()?;
        let request_text = serde_json::to_string_pretty(&request)
            .map_err(|e| LaunchError::Remote(format!("failed to serialize job request: {}", e)))?;

        let job_request_file = self.context.tmp_dir.join("job_request.txt");
        std::fs::write(&job_request_file, &request_text)
            .map_err(|e| LaunchError::io(&job_request_file, e))?;

        if config.common.dry_run {
            info!(
                "[DRY-RUN] Will submit the following job request: {}",
                job_request_file.display()
            );
            return Ok(());
        }

        let token = fetch_access_token()?;
        let url = format!("{}/{}/jobs", BATCH_ENDPOINT, request.parent);
        let response = self
            .http
            .post(&url)
            .query(&[("job_id", request.job_id.as_str())])
            .bearer_auth(token)
            .json(&request.job)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(LaunchError::Remote(format!(
                "job submission for '{}' failed with {}: {}",
                request.job_id, status, body
            )));
        }

        let response_text = response.text().unwrap_or_default();
        std::fs::write(&job_request_file, &response_text)
            .map_err(|e| LaunchError::io(&job_request_file, e))?;

        let job_id = &self.context.job_id;
        info!("Job request submitted: {}", job_request_file.display());
        info!(
            "Job logs:   https://console.cloud.google.com/batch/jobsDetail/regions/{}/jobs/{}/logs?",
            config.region, job_id
        );
        info!(
            "Job status: gcloud batch jobs describe --location={} {} | grep 'state:'",
            config.region, job_id
        );
        info!(
            "Cancel job: gcloud batch jobs cancel --location={} {}",
            config.region, job_id
        );
        Ok(())
    }
}

impl BatchClient for GcpBatchClient {
    fn stage_resources(&mut self) -> Result<()> {
        match self.stage_inner() {
            Ok(()) => {
                self.state = ClientState::Staged;
                Ok(())
            }
            Err(err) => {
                self.state = ClientState::Failed;
                Err(err)
            }
        }
    }

    fn launch_job(&mut self) -> Result<()> {
        match self.launch_inner() {
            Ok(()) => {
                self.state = ClientState::Launched;
                Ok(())
            }
            Err(err) => {
                self.state = ClientState::Failed;
                Err(err)
            }
        }
    }

    fn cancel_job(&mut self) -> Result<()> {
        Err(LaunchError::Unsupported("cancel_job"))
    }

    fn state(&self) -> ClientState {
        self.state
    }
}
