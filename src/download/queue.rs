//! Bounded-concurrency batch orchestration
//!
//! Fans the per-track pipeline out over a batch with a configurable
//! in-flight limit. Outcomes are collected at the single join point;
//! nothing is shared between pipelines while they run. A cancellation
//! token stops admission of new items without disturbing in-flight
//! transfers or their staging files.

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::models::{Quality, TrackDescriptor};
use crate::catalog::service::{BatchKind, CatalogService, ResolvedBatch};
use crate::download::pipeline::{PipelineOutcome, TrackJob, TrackPipeline};
use crate::error::DownloadError;
use crate::utils::m3u::assemble_playlist;

/// Shared parameters for one batch run.
#[derive(Debug, Clone)]
pub struct BatchParams {
    pub quality: Quality,
    /// Override the configured save-path template.
    pub template: Option<String>,
    /// Assemble a playlist even for non-playlist batches.
    pub create_playlist: bool,
    /// Override the configured concurrency limit.
    pub concurrency: Option<usize>,
    /// Override the configured full-path playlist mode.
    pub resolve_full_path: Option<bool>,
    /// Resolve and report without transferring or persisting.
    pub dry_run: bool,
}

impl Default for BatchParams {
    fn default() -> Self {
        Self {
            quality: Quality::Mp3_320,
            template: None,
            create_playlist: false,
            concurrency: None,
            resolve_full_path: None,
            dry_run: false,
        }
    }
}

/// Per-batch report collected at the join point.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<PipelineOutcome>,
    /// Paths of files present on disk after the batch, in outcome order.
    pub saved: Vec<PathBuf>,
}

/// Result of a batch run: the report plus the optional playlist file.
#[derive(Debug)]
pub struct BatchOutput {
    pub report: BatchReport,
    pub playlist: Option<PathBuf>,
}

/// Remove duplicate descriptors from a playlist batch.
///
/// When duplicates are dropped the survivors are re-sorted by their
/// positions and renumbered sequentially so numbering prefixes stay
/// contiguous.
pub fn dedupe_playlist_tracks(tracks: Vec<TrackDescriptor>) -> Vec<TrackDescriptor> {
    let total = tracks.len();
    let mut seen = HashSet::new();
    let mut unique: Vec<TrackDescriptor> = tracks
        .into_iter()
        .filter(|track| seen.insert(track.id.clone()))
        .collect();

    let removed = total - unique.len();
    if removed > 0 {
        warn!("removed {removed} duplicate track(s)");
        unique.sort_by_key(|track| track.track_position.unwrap_or(u32::MAX));
        for (index, track) in unique.iter_mut().enumerate() {
            track.track_position = Some(index as u32 + 1);
        }
    }
    unique
}

/// Run the per-track pipeline over `jobs` with at most `concurrency`
/// in flight, joining on the whole batch.
pub async fn run_batch(
    pipeline: Arc<TrackPipeline>,
    jobs: Vec<TrackJob>,
    concurrency: usize,
    cancel: &CancellationToken,
    progress: &ProgressBar,
) -> BatchReport {
    let total = jobs.len();
    progress.set_length(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let outcomes: Vec<PipelineOutcome> = stream::iter(jobs.into_iter().enumerate())
        .map(|(index, job)| {
            let pipeline = pipeline.clone();
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    debug!("not admitted, batch aborted: {}", job.track.full_title());
                    return PipelineOutcome::Failed("batch aborted".to_string());
                }
                debug!("({}/{total}) {}", index + 1, job.track.full_title());
                pipeline.run(&job).await
            }
        })
        .buffer_unordered(concurrency.max(1))
        .inspect(|outcome| {
            progress.inc(1);
            if let Some(path) = outcome.saved_path() {
                progress.set_message(path.display().to_string());
            }
        })
        .collect()
        .await;

    progress.finish_with_message("Batch complete");

    // saved paths are derived from the joined outcomes; pipelines share
    // no accumulator while running
    let saved = outcomes
        .iter()
        .filter_map(|outcome| outcome.saved_path().map(Path::to_path_buf))
        .collect();

    BatchReport { outcomes, saved }
}

/// Run a resolved batch end to end and optionally assemble its playlist.
pub async fn download_batch(
    pipeline: Arc<TrackPipeline>,
    batch: ResolvedBatch,
    params: &BatchParams,
    cancel: &CancellationToken,
    progress: &ProgressBar,
) -> Result<BatchOutput, DownloadError> {
    let config = pipeline.config().clone();

    let tracks = if batch.kind == BatchKind::Playlist {
        dedupe_playlist_tracks(batch.tracks)
    } else {
        batch.tracks
    };

    let template = params
        .template
        .clone()
        .unwrap_or_else(|| config.save_layout.for_kind(batch.kind).to_string());
    let total = tracks.len();
    info!("downloading {total} track(s)");

    let jobs: Vec<TrackJob> = tracks
        .into_iter()
        .map(|track| TrackJob {
            track,
            quality: params.quality,
            album: batch.album.clone(),
            template: template.clone(),
            total_tracks: total,
            dry_run: params.dry_run,
        })
        .collect();

    let concurrency = params.concurrency.unwrap_or(config.concurrency);
    let report = run_batch(pipeline, jobs, concurrency, cancel, progress).await;

    let playlist = if (params.create_playlist || batch.kind == BatchKind::Playlist)
        && !params.dry_run
    {
        let title = batch
            .album
            .playlist_title
            .clone()
            .or_else(|| batch.album.title.clone())
            .unwrap_or_else(|| "playlist".to_string());
        let resolve_full_path = params
            .resolve_full_path
            .unwrap_or(config.playlist.resolve_full_path);
        assemble_playlist(&report.saved, &title, resolve_full_path).await?
    } else {
        None
    };

    Ok(BatchOutput { report, playlist })
}

/// Resolve a catalog reference and download everything it names.
pub async fn download_reference(
    catalog: &dyn CatalogService,
    pipeline: Arc<TrackPipeline>,
    reference: &str,
    params: &BatchParams,
    cancel: &CancellationToken,
    progress: &ProgressBar,
) -> anyhow::Result<BatchOutput> {
    let batch = catalog.resolve_reference(reference).await?;
    info!("resolved {} track(s) from reference", batch.tracks.len());
    Ok(download_batch(pipeline, batch, params, cancel, progress).await?)
}
