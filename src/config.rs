//! Runtime configuration
//!
//! Read-only settings for the pipeline: concurrency, fallback flags,
//! cover sizes and save-path templates. `Config::load` reads a JSON file;
//! any read or parse error logs a warning and execution continues with
//! the defaults.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::catalog::BatchKind;

/// Cover-art edge size (pixels) per quality tier.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoverSizes {
    #[serde(rename = "128")]
    pub mp3_128: u32,
    #[serde(rename = "320")]
    pub mp3_320: u32,
    pub flac: u32,
}

impl Default for CoverSizes {
    fn default() -> Self {
        Self {
            mp3_128: 500,
            mp3_320: 500,
            flac: 1000,
        }
    }
}

/// Save-path template per batch link type.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SaveLayout {
    pub track: String,
    pub album: String,
    pub artist: String,
    pub playlist: String,
}

impl SaveLayout {
    /// Template used for a batch of the given kind.
    pub fn for_kind(&self, kind: BatchKind) -> &str {
        match kind {
            BatchKind::Track => &self.track,
            BatchKind::Album => &self.album,
            BatchKind::Artist => &self.artist,
            BatchKind::Playlist => &self.playlist,
        }
    }
}

impl Default for SaveLayout {
    fn default() -> Self {
        Self {
            track: "Music/{ALB_TITLE}/{SNG_TITLE}".to_string(),
            album: "Music/{ALB_TITLE}/{SNG_TITLE}".to_string(),
            artist: "Music/{ALB_TITLE}/{SNG_TITLE}".to_string(),
            playlist: "Playlist/{TITLE}/{SNG_TITLE}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaylistConfig {
    /// Keep absolute entries in generated playlists instead of
    /// relativizing them to the playlist directory.
    pub resolve_full_path: bool,
}

/// Pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Maximum concurrently running track pipelines.
    pub concurrency: usize,
    pub save_layout: SaveLayout,
    pub playlist: PlaylistConfig,
    /// Prefix un-numbered save paths with the track position.
    pub track_number: bool,
    /// Allow one attempt on a track's alternate descriptor.
    pub fallback_track: bool,
    /// Allow stepping down the quality ladder when unavailable.
    pub fallback_quality: bool,
    pub cover_size: CoverSizes,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 4,
            save_layout: SaveLayout::default(),
            playlist: PlaylistConfig::default(),
            track_number: true,
            fallback_track: true,
            fallback_quality: true,
            cover_size: CoverSizes::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// A missing file is not an error. Unreadable or malformed files log
    /// a warning and fall back to the defaults; a bad config never stops
    /// a run.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::try_load(path) {
            Ok(config) => {
                debug!("config loaded from {}", path.display());
                config
            }
            Err(err) => {
                warn!("unable to parse config {}: {err:#}", path.display());
                warn!("falling back to default config");
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&contents).context("failed to parse config")
    }
}
