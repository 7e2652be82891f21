//! Subset downloads with retry and atomic placement.
//!
//! - Basic-auth GET against the configured subset endpoint
//! - Body streamed to `{filename}.partial`, renamed once complete
//! - Exponential backoff on timeouts, connection errors, 429 and 5xx
//! - Existing files are kept and not fetched again

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use rtdata_common::CmemsConfig;
use storage::CMEMS_FILES;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::error::{CmemsError, CmemsResult};
use crate::request::SubsetRequest;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub max_retries: u32,
    /// Doubles after each failed attempt.
    pub initial_retry_delay: Duration,
    pub max_retry_delay: Duration,
    pub request_timeout: Duration,
    pub output_dir: PathBuf,
}

impl DownloadConfig {
    pub fn from_cmems(config: &CmemsConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            max_retries: config.max_retries,
            initial_retry_delay: Duration::from_secs(2),
            max_retry_delay: Duration::from_secs(120),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            output_dir: output_dir.into(),
        }
    }
}

pub struct SubsetDownloader {
    client: Client,
    config: DownloadConfig,
}

impl SubsetDownloader {
    pub fn new(config: DownloadConfig) -> CmemsResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }

    /// Download one subset into the output directory and return its path.
    #[instrument(skip(self, request), fields(dataset = %request.dataset_id))]
    pub async fn download(&self, request: &SubsetRequest) -> CmemsResult<PathBuf> {
        fs::create_dir_all(&self.config.output_dir).await?;

        let filename = request.output_filename();
        let final_path = self.config.output_dir.join(&filename);
        let temp_path = self.config.output_dir.join(format!("{}.partial", filename));

        if final_path.exists() {
            info!(path = %final_path.display(), "File already exists, skipping download");
            return Ok(final_path);
        }

        info!(
            filename = %filename,
            start = %request.start,
            end = %request.end,
            "Starting download"
        );

        let mut retry_count = 0;
        let mut delay = self.config.initial_retry_delay;

        loop {
            match self.fetch_to(request, &temp_path).await {
                Ok(bytes) => {
                    // Cross-device rename falls back to copy + delete
                    if fs::rename(&temp_path, &final_path).await.is_err() {
                        fs::copy(&temp_path, &final_path).await?;
                        fs::remove_file(&temp_path).await?;
                    }
                    info!(path = %final_path.display(), bytes, "Download completed");
                    return Ok(final_path);
                }
                Err(e) if e.is_retryable() && retry_count < self.config.max_retries => {
                    retry_count += 1;
                    warn!(
                        error = %e,
                        retry = retry_count,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Download failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.config.max_retry_delay);
                }
                Err(e) => {
                    let _ = fs::remove_file(&temp_path).await;
                    return Err(e);
                }
            }
        }
    }

    /// Download every request in order and append the new file names to the
    /// manifest's `cmems_files` category.
    pub async fn download_all(
        &self,
        requests: &[SubsetRequest],
        manifest_path: &Path,
    ) -> CmemsResult<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(requests.len());
        for request in requests {
            paths.push(self.download(request).await?);
        }

        let names: Vec<PathBuf> = paths
            .iter()
            .filter_map(|p| p.file_name().map(PathBuf::from))
            .collect();
        storage::update(manifest_path, CMEMS_FILES, &names)?;
        Ok(paths)
    }

    async fn fetch_to(&self, request: &SubsetRequest, temp_path: &Path) -> CmemsResult<u64> {
        let response = self
            .client
            .get(&self.config.endpoint)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .query(&request.query())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CmemsError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let mut file = fs::File::create(temp_path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        debug!(bytes = written, path = %temp_path.display(), "Body written");
        Ok(written)
    }
}
