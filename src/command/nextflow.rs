//! Nextflow Command Builder
//!
//! Generates the `nextflow run ...` invocation for a job configuration,
//! branching over the pipeline source kind:
//!
//! - **remote reference** (default): `run <name> -revision <version>`
//! - **local `.nf` file**: the run clause references the mounted basename
//! - **local directory**: the command changes into the mounted directory
//!   and runs `run .` (a directory match overrides a `.nf` filename match)
//!
//! Resume tokens (`RUN_NAME,SESSION_ID`) replace the run-naming clause with
//! `-name <RUN_NAME> -resume <SESSION_ID>`.

use std::path::Path;

use log::info;

use crate::backends::JobConfig;
use crate::command::CommandBuilder;
use crate::error::{LaunchError, Result};

/// [`CommandBuilder`] implementation for Nextflow workflows.
pub struct NextflowCommandBuilder<'a> {
    job_config: &'a JobConfig,
}

impl<'a> NextflowCommandBuilder<'a> {
    pub fn new(job_config: &'a JobConfig) -> Self {
        Self { job_config }
    }
}

/// Returns the final component of a path-like string.
fn basename(value: &str) -> &str {
    Path::new(value)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(value)
}

impl CommandBuilder for NextflowCommandBuilder<'_> {
    fn build(&self) -> Result<String> {
        info!("Building Nextflow command ...");

        let config = self.job_config;
        let mount = config.config_mount_path.display();
        let executor_config_filename = basename(&config.executor_config_file);

        let run_clause = match &config.pipeline_version {
            Some(version) => format!("run {} -revision {}", config.pipeline_name, version),
            None => format!("run {}", config.pipeline_name),
        };

        let mut cmd: Vec<String> = vec![
            "nextflow".to_string(),
            format!("-log {}/logs/nextflow.log", mount),
            run_clause,
            format!("-c {}/config/{}", mount, executor_config_filename),
            format!("-name {}", config.workflowrun_id),
        ];

        if config.pipeline_name.ends_with(".nf") {
            let workflow_filename = basename(&config.pipeline_name);
            cmd[2] = format!("run {}/config/{}", mount, workflow_filename);
        }

        // Directory check runs last so it wins over the filename match
        if Path::new(&config.pipeline_name).is_dir() {
            let directory_name = basename(&config.pipeline_name);
            cmd[0] = format!("cd {}/config/{} && nextflow", mount, directory_name);
            cmd[2] = "run .".to_string();
        }

        if let Some(resume) = &config.resume {
            let parts: Vec<&str> = resume.split(',').collect();
            match parts.as_slice() {
                [run_name, session_id] if !run_name.is_empty() && !session_id.is_empty() => {
                    let last = cmd.len() - 1;
                    cmd[last] = format!("-name {} -resume {}", run_name, session_id);
                }
                _ => {
                    return Err(LaunchError::validation(format!(
                        "Invalid resume format. Expected 'WORKFLOWRUN_ID,SESSION_ID', got '{}'",
                        resume
                    )));
                }
            }
        }

        if let Some(config_file) = &config.config_file {
            cmd.push(format!("-c {}/config/{}", mount, basename(config_file)));
        }

        if let Some(params_file) = &config.params_file {
            cmd.push(format!("-params-file {}/input/{}", mount, basename(params_file)));
        }

        if let Some(profile) = &config.profile {
            cmd.push(format!("-profile {}", profile));
        }

        let nxf_cmd = cmd.join(" ");

        let cache_cmd = format!(
            "export NXF_CLOUDCACHE_PATH=gs://{} && export NXF_IGNORE_RESUME_HISTORY=true",
            config.remote_cache_path
        );

        Ok(format!("{} && {}", cache_cmd, nxf_cmd))
    }
}
