use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{Result, ReelError};

/// Downloads a remote asset into the workspace
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch `url` into `destination`, returning the number of bytes written.
    ///
    /// Either the complete body ends up at `destination` or an error is
    /// returned and nothing is left there.
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64>;
}

/// Single-attempt HTTP downloader
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!("reelsmith/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(ReelError::Http)?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn download(&self, url: &str, part_path: &Path) -> Result<u64> {
        let fetch_error = |status: Option<u16>, message: String| ReelError::AssetFetch {
            url: url.to_string(),
            status,
            message,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(
                Some(status.as_u16()),
                status.canonical_reason().unwrap_or("request failed").to_string(),
            ));
        }

        let expected = response.content_length();
        let pb = download_progress(expected);

        let mut file = fs::File::create(part_path).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = response.chunk().await.map_err(|e| {
            fetch_error(Some(status.as_u16()), format!("transfer interrupted: {}", e))
        })? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            pb.set_position(written);
        }

        file.flush().await?;
        drop(file);
        pb.finish_and_clear();

        if written == 0 {
            return Err(fetch_error(Some(status.as_u16()), "empty response body".to_string()));
        }
        if let Some(expected) = expected {
            if expected != written {
                return Err(fetch_error(
                    Some(status.as_u16()),
                    format!("received {} of {} bytes", written, expected),
                ));
            }
        }

        Ok(written)
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64> {
        info!("Downloading {} to {}", url, destination.display());

        let part_path = partial_path(destination);
        match self.download(url, &part_path).await {
            Ok(bytes) => {
                fs::rename(&part_path, destination).await?;
                info!("Downloaded {} bytes", bytes);
                Ok(bytes)
            }
            Err(e) => {
                if fs::remove_file(&part_path).await.is_ok() {
                    debug!("Removed partial download {}", part_path.display());
                }
                Err(e)
            }
        }
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

fn download_progress(length: Option<u64>) -> ProgressBar {
    let pb = match length {
        Some(length) => ProgressBar::new(length),
        None => ProgressBar::new_spinner(),
    };
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
