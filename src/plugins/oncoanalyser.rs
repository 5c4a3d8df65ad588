//! Oncoanalyser Samplesheet Plugin
//!
//! Generates an nf-core/oncoanalyser samplesheet for a paired tumor/normal
//! DNA run. The tumor and normal identifiers arrive via `--sample-id` as
//! `TUMOR_ID,NORMAL_ID`; the bucket holding the aligned reads and the file
//! extension to match come from `--plugin-options`:
//!
//! - `remote_sample_bucket_uri`: `gs://` URI of the sample bucket
//! - `filetype`: extension of the alignment files, e.g. `.bam`
//!
//! For each identifier the most recently updated matching object is picked
//! and written to `<tmp_dir>/samplesheet.csv` together with its index file.

use std::fs::File;
use std::io::Write;

use log::info;

use crate::backends::gcp::storage::{get_latest_file, parse_gcs_path, StorageClient};
use crate::backends::{ConfigPatch, JobConfig};
use crate::error::{LaunchError, Result};
use crate::plugins::Plugin;

/// Samplesheet generator for paired tumor/normal oncoanalyser runs.
#[derive(Debug)]
pub struct OncoanalyserPlugin;

/// One samplesheet row before the shared group columns are prepended.
struct SampleRow<'a> {
    sample_id: &'a str,
    sample_type: &'a str,
    filetype: &'a str,
    filepath: String,
}

impl OncoanalyserPlugin {
    /// Extracts a required string option from the plugin options map.
    fn required_option<'a>(job_config: &'a JobConfig, key: &str) -> Result<&'a str> {
        job_config
            .plugin_options
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                LaunchError::validation(format!(
                    "Oncoanalyser plugin requires '{}' in plugin options.",
                    key
                ))
            })
    }
}

impl Plugin for OncoanalyserPlugin {
    fn load(&self, job_config: &JobConfig, store: &dyn StorageClient) -> Result<ConfigPatch> {
        let tmp_csv = job_config.tmp_dir.join("samplesheet.csv");

        let bucket_uri = Self::required_option(job_config, "remote_sample_bucket_uri")?;
        let filename_extension = Self::required_option(job_config, "filetype")?;

        let sample_id = &job_config.sample_id;
        let (tumor_id, normal_id) = sample_id
            .split_once(',')
            .map(|(t, n)| (t.trim(), n.trim()))
            .filter(|(t, n)| !t.is_empty() && !n.is_empty())
            .ok_or_else(|| {
                LaunchError::validation(
                    "Oncoanalyser plugin expects --sample-id in 'TUMOR_ID,NORMAL_ID' format.",
                )
            })?;

        let patch = ConfigPatch {
            samplesheet: Some(tmp_csv.display().to_string()),
        };

        if job_config.dry_run {
            info!(
                "[DRY-RUN] samplesheet will be written to: {}",
                tmp_csv.display()
            );
            return Ok(patch);
        }

        let (bucket_name, bucket_prefix) = parse_gcs_path(bucket_uri)?;

        let tumor_bam = get_latest_file(
            store,
            &bucket_name,
            &bucket_prefix,
            Some(tumor_id),
            filename_extension,
        )?;
        let normal_bam = get_latest_file(
            store,
            &bucket_name,
            &bucket_prefix,
            Some(normal_id),
            filename_extension,
        )?;

        let rows = [
            SampleRow {
                sample_id: tumor_id,
                sample_type: "tumor",
                filetype: "bam",
                filepath: tumor_bam.clone(),
            },
            SampleRow {
                sample_id: tumor_id,
                sample_type: "tumor",
                filetype: "bai",
                filepath: format!("{}.bai", tumor_bam),
            },
            SampleRow {
                sample_id: normal_id,
                sample_type: "normal",
                filetype: "bam",
                filepath: normal_bam.clone(),
            },
            SampleRow {
                sample_id: normal_id,
                sample_type: "normal",
                filetype: "bai",
                filepath: format!("{}.bai", normal_bam),
            },
        ];

        let group_id = format!("{}_{}", tumor_id, normal_id);
        let mut file = File::create(&tmp_csv).map_err(|e| LaunchError::io(&tmp_csv, e))?;
        writeln!(
            file,
            "group_id,subject_id,sample_id,sample_type,sequence_type,filetype,filepath"
        )
        .map_err(|e| LaunchError::io(&tmp_csv, e))?;
        for row in &rows {
            writeln!(
                file,
                "{},{},{},{},dna,{},{}",
                group_id, group_id, row.sample_id, row.sample_type, row.filetype, row.filepath
            )
            .map_err(|e| LaunchError::io(&tmp_csv, e))?;
        }

        info!("Samplesheet written to {}", tmp_csv.display());
        Ok(patch)
    }
}
