//! Google Cloud Platform Backend
//!
//! Implementation set for the `google-batch` backend: job configuration
//! with GCP defaults, a GCS storage client, staging and executor-config
//! generation, and the Batch submission client.

pub mod batch;
pub mod file;
pub mod job;
pub mod storage;

pub use batch::GcpBatchClient;
pub use file::{GcpExecutorConfigBuilder, GcpFileUploader};
pub use job::{GcpJobConfig, GcpJobConfigBuilder};
pub use storage::{get_latest_file, parse_gcs_path, GcsClient, ObjectMeta, StorageClient};
