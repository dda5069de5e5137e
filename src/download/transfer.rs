//! Resumable byte-range transfer into staging files
//!
//! Streams a resolved source URL straight to disk. A partial staging file
//! resumes with a `Range` request from its current length; nothing is
//! ever buffered whole in memory or truncated on failure.

use futures::StreamExt;
use reqwest::Client;
use reqwest::header::RANGE;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::catalog::models::{Quality, TrackDescriptor};
use crate::error::DownloadError;

/// Net bytes of progress between visible reports.
const PROGRESS_STEP: u64 = 50_000;

/// Staging file name for one (quality, track, content) combination.
///
/// A pure function of the attempt identity: concurrent pipelines never
/// target the same file, and a re-run resumes its own partial transfer.
pub fn staging_file_name(quality: Quality, track: &TrackDescriptor) -> String {
    format!("quaver_{}_{}_{}", quality.label(), track.id, track.checksum)
}

/// Streams remote sources into staging files with byte-range resume.
pub struct TransferManager {
    client: Client,
    staging_dir: PathBuf,
}

impl TransferManager {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .user_agent(concat!("quaver/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            staging_dir: staging_dir.into(),
        })
    }

    pub fn staging_path(&self, quality: Quality, track: &TrackDescriptor) -> PathBuf {
        self.staging_dir.join(staging_file_name(quality, track))
    }

    /// Fetch `url` into `staging`, resuming from its current length.
    ///
    /// On success the staging file holds exactly `expected_size` bytes.
    /// An early-terminated stream fails with
    /// [`DownloadError::TransferIncomplete`] and leaves the partial file
    /// in place for a later resume.
    pub async fn fetch(
        &self,
        url: &str,
        expected_size: u64,
        staging: &Path,
        mut on_progress: impl FnMut(u64, u64),
    ) -> Result<(), DownloadError> {
        let offset = match fs::metadata(staging).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };
        if expected_size > 0 && offset >= expected_size {
            debug!("staging file already complete: {}", staging.display());
            return Ok(());
        }

        let mut request = self.client.get(url);
        if offset > 0 {
            debug!("resuming transfer at byte {offset}");
            request = request.header(RANGE, format!("bytes={offset}-"));
        }

        let response = request.send().await?.error_for_status()?;

        if let Some(parent) = staging.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(staging)
            .await?;

        let mut transferred = offset;
        let mut last_reported = offset;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    // Keep the partial file; the next run resumes from
                    // its length.
                    debug!("transfer interrupted: {err}");
                    file.flush().await?;
                    return Err(DownloadError::TransferIncomplete {
                        received: transferred,
                        expected: expected_size,
                    });
                }
            };
            file.write_all(&chunk).await?;
            transferred += chunk.len() as u64;
            if transferred - last_reported > PROGRESS_STEP {
                last_reported = transferred;
                on_progress(transferred, expected_size);
            }
        }
        file.flush().await?;

        let written = fs::metadata(staging).await?.len();
        if written != expected_size {
            return Err(DownloadError::TransferIncomplete {
                received: written,
                expected: expected_size,
            });
        }

        on_progress(written, expected_size);
        Ok(())
    }
}
