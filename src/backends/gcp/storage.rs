//! Google Cloud Storage Client
//!
//! Thin REST wrapper over the GCS JSON API plus the [`StorageClient`] trait
//! that keeps the uploader and plugins testable without a network.
//!
//! # Authentication
//!
//! A bearer token is resolved in the following order:
//! 1. `GOOGLE_OAUTH_ACCESS_TOKEN` environment variable
//! 2. `gcloud auth print-access-token` on the local PATH

use std::env;
use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};
use log::debug;
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::error::{LaunchError, Result};

/// Metadata for one stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Full object name (path within the bucket).
    pub name: String,
    /// Last update time reported by the provider.
    pub updated: DateTime<Utc>,
}

/// Object storage operations needed by the launcher.
///
/// The production implementation is [`GcsClient`]; tests substitute an
/// in-memory double.
pub trait StorageClient: Send + Sync {
    /// Uploads the file at `local_path` to `gs://bucket/object`.
    fn upload_object(&self, bucket: &str, object: &str, local_path: &Path) -> Result<()>;

    /// Lists objects under `prefix`, returning name and update time.
    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>>;
}

/// Splits a `gs://bucket/prefix` URI into `(bucket, prefix)`.
pub fn parse_gcs_path(gcs_uri: &str) -> Result<(String, String)> {
    let rest = gcs_uri
        .strip_prefix("gs://")
        .ok_or_else(|| LaunchError::validation("Invalid GCS URI: must start with 'gs://'"))?;

    let (bucket, prefix) = match rest.split_once('/') {
        Some((bucket, prefix)) => (bucket, prefix),
        None => (rest, ""),
    };
    if bucket.is_empty() {
        return Err(LaunchError::validation(
            "Invalid GCS URI: bucket name is empty",
        ));
    }

    Ok((bucket.to_string(), prefix.trim_matches('/').to_string()))
}

/// Returns the most recently updated object under `bucket_prefix` matching
/// the extension (and optional filename prefix), as a full `gs://` URI.
///
/// Returns an empty string when nothing matches.
pub fn get_latest_file(
    store: &dyn StorageClient,
    bucket_name: &str,
    bucket_prefix: &str,
    filename_prefix: Option<&str>,
    filename_extension: &str,
) -> Result<String> {
    let objects = store.list_objects(bucket_name, bucket_prefix)?;

    let mut latest: Option<&ObjectMeta> = None;
    for object in &objects {
        if !object.name.ends_with(filename_extension) {
            continue;
        }
        let basename = object.name.rsplit('/').next().unwrap_or(&object.name);
        if let Some(prefix) = filename_prefix {
            if !basename.starts_with(prefix) {
                continue;
            }
        }
        if latest.map_or(true, |best| object.updated > best.updated) {
            latest = Some(object);
        }
    }

    Ok(latest
        .map(|o| format!("gs://{}/{}", bucket_name, o.name))
        .unwrap_or_default())
}

const STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

/// Production [`StorageClient`] backed by the GCS JSON API.
pub struct GcsClient {
    http: reqwest::blocking::Client,
    token: OnceCell<String>,
}

impl GcsClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            token: OnceCell::new(),
        }
    }

    /// Resolves and caches the bearer token for this process.
    fn access_token(&self) -> Result<&str> {
        self.token.get_or_try_init(fetch_access_token).map(String::as_str)
    }
}

/// Resolves a bearer token for Google APIs: environment variable first,
/// then the local `gcloud` credential helper.
pub(crate) fn fetch_access_token() -> Result<String> {
    if let Ok(token) = env::var("GOOGLE_OAUTH_ACCESS_TOKEN") {
        if !token.trim().is_empty() {
            debug!("Using access token from GOOGLE_OAUTH_ACCESS_TOKEN");
            return Ok(token.trim().to_string());
        }
    }

    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .map_err(|e| {
            LaunchError::Remote(format!(
                "failed to run 'gcloud auth print-access-token': {}",
                e
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LaunchError::Remote(format!(
            "'gcloud auth print-access-token' failed: {}",
            stderr.trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(LaunchError::Remote(
            "no access token available; set GOOGLE_OAUTH_ACCESS_TOKEN or run 'gcloud auth login'"
                .to_string(),
        ));
    }
    Ok(token)
}

impl Default for GcsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ObjectItem>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ObjectItem {
    name: String,
    updated: DateTime<Utc>,
}

impl StorageClient for GcsClient {
    fn upload_object(&self, bucket: &str, object: &str, local_path: &Path) -> Result<()> {
        let bytes = std::fs::read(local_path).map_err(|e| LaunchError::io(local_path, e))?;
        let token = self.access_token()?;

        let url = format!("{}/upload/storage/v1/b/{}/o", STORAGE_ENDPOINT, bucket);
        let response = self
            .http
            .post(&url)
            .query(&[("uploadType", "media"), ("name", object)])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(LaunchError::Remote(format!(
                "upload of 'gs://{}/{}' failed with {}: {}",
                bucket, object, status, body
            )));
        }

        Ok(())
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let token = self.access_token()?.to_string();
        let url = format!("{}/storage/v1/b/{}/o", STORAGE_ENDPOINT, bucket);

        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .query(&[("prefix", prefix)])
                .bearer_auth(&token);
            if let Some(ref t) = page_token {
                request = request.query(&[("pageToken", t.as_str())]);
            }

            let response = request.send()?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().unwrap_or_default();
                return Err(LaunchError::Remote(format!(
                    "listing 'gs://{}/{}' failed with {}: {}",
                    bucket, prefix, status, body
                )));
            }

            let page: ListResponse = response.json()?;
            objects.extend(page.items.into_iter().map(|item| ObjectMeta {
                name: item.name,
                updated: item.updated,
            }));

            match page.next_page_token {
                Some(t) => page_token = Some(t),
                None => break,
            }
        }

        Ok(objects)
    }
}
