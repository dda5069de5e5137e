//! Collaborator seams consumed by the pipeline
//!
//! Catalog lookup, download-source resolution and tagging are external
//! services. The pipeline only depends on these traits; implementations
//! live with the caller.

use async_trait::async_trait;

use super::models::{AlbumContext, Quality, TrackDescriptor};
use crate::error::DownloadError;

/// Resolved download source for one (track, quality) attempt.
#[derive(Debug, Clone)]
pub struct TrackSource {
    pub url: String,
    /// Authoritative transfer size; overrides the descriptor's own
    /// per-quality size.
    pub file_size: u64,
    /// Whether the stream is chunk-obfuscated and needs decoding.
    pub encrypted: bool,
}

/// Resolves a direct download source for a track at a given quality.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Errors with [`DownloadError::GeoBlocked`] or
    /// [`DownloadError::NotFound`] drive fallback resolution; anything
    /// else fails the track.
    async fn resolve(
        &self,
        track: &TrackDescriptor,
        quality: Quality,
    ) -> Result<TrackSource, DownloadError>;
}

/// Embeds metadata and cover art into decoded audio. Opaque to the
/// pipeline: the returned buffer is persisted as-is.
#[async_trait]
pub trait Tagger: Send + Sync {
    async fn tag(
        &self,
        audio: Vec<u8>,
        track: &TrackDescriptor,
        cover_size: u32,
    ) -> Result<Vec<u8>, DownloadError>;
}

/// What kind of catalog reference a batch was resolved from. Selects the
/// save-path template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Track,
    Album,
    Artist,
    Playlist,
}

/// A batch of tracks resolved from a single catalog reference.
#[derive(Debug, Clone)]
pub struct ResolvedBatch {
    pub kind: BatchKind,
    pub tracks: Vec<TrackDescriptor>,
    pub album: AlbumContext,
}

/// Resolves a URL or query into track descriptors and album context.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn resolve_reference(&self, reference: &str) -> anyhow::Result<ResolvedBatch>;
}
