//! Per-track resolution pipeline
//!
//! One run takes a track descriptor to a verified file on disk: render
//! the save path, bail out if it already exists, walk the bounded
//! fallback loop to a usable source, stream it into the staging file,
//! reverse the chunk obfuscation, hand off to the tagger, persist, and
//! drop the staging file. Every error is caught at this boundary and
//! becomes an outcome attributed to the track.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::catalog::models::{AlbumContext, Quality, TrackDescriptor};
use crate::catalog::service::{SourceResolver, Tagger, TrackSource};
use crate::config::Config;
use crate::download::cipher;
use crate::download::fallback::{self, AttemptState, Decision};
use crate::download::transfer::TransferManager;
use crate::error::DownloadError;
use crate::utils::layout::{LayoutOptions, render_layout};

/// Terminal outcome of one track's pipeline run.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Transferred, decoded, tagged and persisted at the path.
    Saved(PathBuf),
    /// The rendered path already exists; existing files are never
    /// overwritten.
    SkippedExists(PathBuf),
    /// No (track, quality) attempt had a usable source.
    SkippedUnavailable,
    /// The track failed; sibling pipelines are unaffected.
    Failed(String),
}

impl PipelineOutcome {
    /// Path that should appear in batch reports and playlists.
    pub fn saved_path(&self) -> Option<&Path> {
        match self {
            Self::Saved(path) | Self::SkippedExists(path) => Some(path),
            Self::SkippedUnavailable | Self::Failed(_) => None,
        }
    }
}

/// One track's worth of work, with the batch-shared parameters it needs.
#[derive(Debug, Clone)]
pub struct TrackJob {
    pub track: TrackDescriptor,
    pub quality: Quality,
    pub album: AlbumContext,
    /// Save-path template for the batch's link type.
    pub template: String,
    /// Batch size; widens the numbering prefix at 100 items.
    pub total_tracks: usize,
    /// Resolve and report without transferring or persisting.
    pub dry_run: bool,
}

/// Executes the full pipeline for single tracks.
pub struct TrackPipeline {
    resolver: Arc<dyn SourceResolver>,
    tagger: Arc<dyn Tagger>,
    transfer: TransferManager,
    config: Config,
}

impl TrackPipeline {
    pub fn new(
        resolver: Arc<dyn SourceResolver>,
        tagger: Arc<dyn Tagger>,
        transfer: TransferManager,
        config: Config,
    ) -> Self {
        Self {
            resolver,
            tagger,
            transfer,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the pipeline for one track, converting every error into an
    /// outcome. This never propagates; siblings keep running.
    pub async fn run(&self, job: &TrackJob) -> PipelineOutcome {
        match self.execute(job).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("{}: {err}", job.track.full_title());
                PipelineOutcome::Failed(err.to_string())
            }
        }
    }

    async fn execute(&self, job: &TrackJob) -> Result<PipelineOutcome, DownloadError> {
        let options = LayoutOptions {
            number_tracks: self.config.track_number,
            min_digits: if job.total_tracks >= 100 { 3 } else { 2 },
        };

        debug!(
            "resolving {} by {} from {}",
            job.track.full_title(),
            job.track.artist_name,
            job.track.album_title
        );

        let mut current = job.track.clone();
        let mut state = AttemptState::new(
            job.quality,
            self.config.fallback_track,
            self.config.fallback_quality,
        );

        // Bounded attempt loop: at most one track-level fallback and two
        // quality step-downs, so it always reaches a terminal branch.
        let (source, save_path) = loop {
            let rendered = render_layout(&job.template, &current, &job.album, &options);
            let save_path = PathBuf::from(format!("{rendered}{}", state.quality.extension()));

            if fs::try_exists(&save_path).await? {
                info!("skipped {}, already exists", current.full_title());
                return Ok(PipelineOutcome::SkippedExists(save_path));
            }

            match self.resolver.resolve(&current, state.quality).await {
                Ok(source) => break (source, save_path),
                Err(err) if err.is_unavailable() => {
                    match fallback::next_attempt(&current, &state) {
                        Decision::RetryTrack { track, state: next } => {
                            info!(
                                "{} unavailable, trying alternate {}",
                                current.full_title(),
                                track.full_title()
                            );
                            current = track;
                            state = next;
                        }
                        Decision::RetryQuality { state: next } => {
                            info!(
                                "{} unavailable at {}, stepping down to {}",
                                current.full_title(),
                                state.quality,
                                next.quality
                            );
                            state = next;
                        }
                        Decision::GiveUp => {
                            warn!("skipped {}, not available", current.full_title());
                            return Ok(PipelineOutcome::SkippedUnavailable);
                        }
                    }
                }
                Err(err) => return Err(err),
            }
        };

        if job.dry_run {
            info!("would save {}", save_path.display());
            return Ok(PipelineOutcome::Saved(save_path));
        }

        self.persist(&current, &state, &source, save_path).await
    }

    async fn persist(
        &self,
        track: &TrackDescriptor,
        state: &AttemptState,
        source: &TrackSource,
        save_path: PathBuf,
    ) -> Result<PipelineOutcome, DownloadError> {
        let staging = self.transfer.staging_path(state.quality, track);

        let title = track.full_title();
        self.transfer
            .fetch(&source.url, source.file_size, &staging, |transferred, total| {
                debug!("downloading {title}: {transferred}/{total} bytes");
            })
            .await?;

        let raw = fs::read(&staging).await?;
        let audio = if source.encrypted {
            debug!("decoding {}", title);
            cipher::decrypt(&raw, &track.id)?
        } else {
            raw
        };

        debug!("tagging {}", title);
        let cover_size = state.quality.cover_size(&self.config.cover_size);
        let tagged = self.tagger.tag(audio, track, cover_size).await?;

        if let Some(parent) = save_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&save_path, &tagged).await?;
        fs::remove_file(&staging).await?;

        info!(
            "{}saved {} by {}",
            if state.is_fallback { "[alternate] " } else { "" },
            title,
            track.artist_name
        );
        if state.is_quality_fallback {
            info!("used {} as other formats were unavailable", state.quality);
        }

        Ok(PipelineOutcome::Saved(save_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::tests::track;
    use crate::download::cipher::stream_key;
    use crate::testutil::serve_once;
    use async_trait::async_trait;
    use blowfish::Blowfish;
    use cbc::cipher::block_padding::NoPadding;
    use cbc::cipher::{BlockEncryptMut, KeyIvInit};

    struct FixedResolver {
        source: TrackSource,
    }

    #[async_trait]
    impl SourceResolver for FixedResolver {
        async fn resolve(
            &self,
            _track: &TrackDescriptor,
            _quality: Quality,
        ) -> Result<TrackSource, DownloadError> {
            Ok(self.source.clone())
        }
    }

    struct PassthroughTagger;

    #[async_trait]
    impl Tagger for PassthroughTagger {
        async fn tag(
            &self,
            audio: Vec<u8>,
            _track: &TrackDescriptor,
            _cover_size: u32,
        ) -> Result<Vec<u8>, DownloadError> {
            Ok(audio)
        }
    }

    /// Chunk-obfuscate a plaintext the way the provider serves it.
    fn obfuscate(plain: &[u8], track_id: &str) -> Vec<u8> {
        let key = stream_key(track_id);
        let mut source = plain.to_vec();
        for (index, start) in (0..plain.len()).step_by(2048).enumerate() {
            let end = usize::min(start + 2048, plain.len());
            if index % 3 != 0 || end - start < 2048 {
                continue;
            }
            let encryptor =
                cbc::Encryptor::<Blowfish>::new_from_slices(&key, &[0, 1, 2, 3, 4, 5, 6, 7])
                    .unwrap();
            encryptor
                .encrypt_padded_mut::<NoPadding>(&mut source[start..end], 2048)
                .unwrap();
        }
        source
    }

    fn job(track: TrackDescriptor, template: String) -> TrackJob {
        TrackJob {
            track,
            quality: Quality::Mp3_320,
            album: AlbumContext::default(),
            template,
            total_tracks: 1,
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn test_pipeline_transfers_decodes_and_persists() {
        let plain: Vec<u8> = (0..5000u32).map(|i| (i % 249) as u8).collect();
        let body = obfuscate(&plain, "3135556");
        let (url, _served) = serve_once(body.clone(), "200 OK").await;

        let dir = tempfile::tempdir().unwrap();
        let mut descriptor = track("3135556", "Harder Better Faster Stronger");
        descriptor.track_position = None;

        let pipeline = TrackPipeline::new(
            Arc::new(FixedResolver {
                source: TrackSource {
                    url,
                    file_size: body.len() as u64,
                    encrypted: true,
                },
            }),
            Arc::new(PassthroughTagger),
            TransferManager::new(dir.path().join("staging")).unwrap(),
            Config::default(),
        );

        let job = job(
            descriptor.clone(),
            format!("{}/Music/{{SNG_TITLE}}", dir.path().display()),
        );
        let outcome = pipeline.run(&job).await;

        let saved = match outcome {
            PipelineOutcome::Saved(path) => path,
            other => panic!("expected Saved, got {other:?}"),
        };
        assert_eq!(
            saved,
            dir.path().join("Music/Harder Better Faster Stronger.mp3")
        );
        assert_eq!(tokio::fs::read(&saved).await.unwrap(), plain);

        // staging file removed after persisting
        let staging = pipeline.transfer.staging_path(Quality::Mp3_320, &descriptor);
        assert!(!staging.exists());

        // a second run never overwrites: it short-circuits before any
        // network or transfer work
        let outcome = pipeline.run(&job).await;
        match outcome {
            PipelineOutcome::SkippedExists(path) => assert_eq!(path, saved),
            other => panic!("expected SkippedExists, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unavailable_track_without_fallback_is_skipped() {
        struct Unavailable;

        #[async_trait]
        impl SourceResolver for Unavailable {
            async fn resolve(
                &self,
                _track: &TrackDescriptor,
                _quality: Quality,
            ) -> Result<TrackSource, DownloadError> {
                Err(DownloadError::NotFound)
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let pipeline = TrackPipeline::new(
            Arc::new(Unavailable),
            Arc::new(PassthroughTagger),
            TransferManager::new(dir.path().join("staging")).unwrap(),
            Config::default(),
        );

        let mut descriptor = track("404", "Missing");
        descriptor.track_position = None;
        let job = job(
            descriptor,
            format!("{}/Music/{{SNG_TITLE}}", dir.path().display()),
        );

        assert!(matches!(
            pipeline.run(&job).await,
            PipelineOutcome::SkippedUnavailable
        ));
    }

    #[tokio::test]
    async fn test_fatal_error_becomes_failed_outcome() {
        struct RejectingTagger;

        #[async_trait]
        impl Tagger for RejectingTagger {
            async fn tag(
                &self,
                _audio: Vec<u8>,
                _track: &TrackDescriptor,
                _cover_size: u32,
            ) -> Result<Vec<u8>, DownloadError> {
                Err(DownloadError::Tagging("unsupported container".into()))
            }
        }

        let body = vec![9u8; 100];
        let (url, _served) = serve_once(body.clone(), "200 OK").await;

        let dir = tempfile::tempdir().unwrap();
        let mut descriptor = track("7", "Broken");
        descriptor.track_position = None;

        let pipeline = TrackPipeline::new(
            Arc::new(FixedResolver {
                source: TrackSource {
                    url,
                    file_size: body.len() as u64,
                    encrypted: false,
                },
            }),
            Arc::new(RejectingTagger),
            TransferManager::new(dir.path().join("staging")).unwrap(),
            Config::default(),
        );

        let job = job(
            descriptor,
            format!("{}/Music/{{SNG_TITLE}}", dir.path().display()),
        );
        match pipeline.run(&job).await {
            PipelineOutcome::Failed(reason) => assert!(reason.contains("tagging failed")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
