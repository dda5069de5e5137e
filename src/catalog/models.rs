//! Catalog data model: tracks, album context, quality tiers

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::CoverSizes;

/// Audio quality tier offered by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    Mp3_128,
    Mp3_320,
    Flac,
}

impl Quality {
    /// Parse a user-facing quality label.
    ///
    /// Accepts the provider's numeric codes and common spellings; unknown
    /// labels resolve to 320 kbps, matching the provider clients' default.
    pub fn from_label(label: &str) -> Self {
        match label {
            "1" | "128" | "MP3_128" | "128kbps" => Self::Mp3_128,
            "9" | "flac" | "Flac" | "FLAC" => Self::Flac,
            _ => Self::Mp3_320,
        }
    }

    /// Short label used in staging-file names.
    pub fn label(self) -> &'static str {
        match self {
            Self::Mp3_128 => "128",
            Self::Mp3_320 => "320",
            Self::Flac => "flac",
        }
    }

    /// File extension for audio saved at this tier.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3_128 | Self::Mp3_320 => ".mp3",
            Self::Flac => ".flac",
        }
    }

    /// Expected transfer size for a track at this tier.
    pub fn file_size(self, track: &TrackDescriptor) -> u64 {
        match self {
            Self::Mp3_128 => track.filesize_128,
            Self::Mp3_320 => track.filesize_320,
            Self::Flac => track.filesize_flac,
        }
    }

    /// Cover-art edge size to request when tagging at this tier.
    pub fn cover_size(self, sizes: &CoverSizes) -> u32 {
        match self {
            Self::Mp3_128 => sizes.mp3_128,
            Self::Mp3_320 => sizes.mp3_320,
            Self::Flac => sizes.flac,
        }
    }

    /// Next rung down the quality ladder: flac -> 320 -> 128.
    pub fn step_down(self) -> Option<Self> {
        match self {
            Self::Flac => Some(Self::Mp3_320),
            Self::Mp3_320 => Some(Self::Mp3_128),
            Self::Mp3_128 => None,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mp3_128 => write!(f, "128kbps"),
            Self::Mp3_320 => write!(f, "320kbps"),
            Self::Flac => write!(f, "FLAC"),
        }
    }
}

/// Catalog record for one track.
///
/// Immutable once resolved by the catalog collaborator; a track-level
/// fallback clones it with the alternate's fields overlaid via
/// [`TrackDescriptor::overlay`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub id: String,
    pub title: String,
    /// Version marker the catalog keeps separate from the title
    /// (e.g. "(Remastered)").
    pub version: Option<String>,
    pub artist_id: u64,
    pub artist_name: String,
    pub album_title: String,
    pub disk_number: Option<u32>,
    pub track_position: Option<u32>,
    pub filesize_128: u64,
    pub filesize_320: u64,
    pub filesize_flac: u64,
    /// Provider content checksum; part of the staging-file identity.
    pub checksum: String,
    pub encrypted: bool,
    /// Alternate descriptor usable for a track-level fallback.
    pub fallback: Option<Box<TrackDescriptor>>,
}

impl TrackDescriptor {
    /// Title with the version marker appended when not already part of it.
    pub fn full_title(&self) -> String {
        match &self.version {
            Some(version) if !self.title.contains(version.as_str()) => {
                format!("{} {}", self.title, version)
            }
            _ => self.title.clone(),
        }
    }

    /// Overlay an alternate descriptor onto this one for a track-level
    /// fallback attempt.
    ///
    /// Identity, sizes, checksum and encryption come from the alternate;
    /// positional fields the alternate leaves unset are inherited. The
    /// merged record carries no further alternate, so a second track-level
    /// fallback has nothing to fire on.
    pub fn overlay(&self, alternate: &TrackDescriptor) -> TrackDescriptor {
        TrackDescriptor {
            id: alternate.id.clone(),
            title: alternate.title.clone(),
            version: alternate.version.clone().or_else(|| self.version.clone()),
            artist_id: alternate.artist_id,
            artist_name: alternate.artist_name.clone(),
            album_title: alternate.album_title.clone(),
            disk_number: alternate.disk_number.or(self.disk_number),
            track_position: alternate.track_position.or(self.track_position),
            filesize_128: alternate.filesize_128,
            filesize_320: alternate.filesize_320,
            filesize_flac: alternate.filesize_flac,
            checksum: alternate.checksum.clone(),
            encrypted: alternate.encrypted,
            fallback: None,
        }
    }
}

/// Read-only album metadata used by the path renderer alongside the track.
///
/// Template lookups consult this context first and fall back to the track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlbumContext {
    pub title: Option<String>,
    /// Total number of disks in the release.
    pub disk_count: Option<u32>,
    /// Playlist title, for playlist batches.
    pub playlist_title: Option<String>,
}
