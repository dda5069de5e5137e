//! Error taxonomy for the download pipeline

use thiserror::Error;

/// Errors scoped to a single track's pipeline run.
///
/// The batch queue converts all of these into per-track outcomes; they
/// never abort sibling pipelines. Only failures before any pipeline starts
/// surface to the caller directly.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The source exists but is not served in the caller's region. Still
    /// eligible for track-level fallback.
    #[error("not available in the current region")]
    GeoBlocked,

    /// No source exists for the requested (track, quality).
    #[error("no source available")]
    NotFound,

    /// The stream ended before the expected byte count arrived. The
    /// partial staging file is kept so a later run can resume from its
    /// length.
    #[error("transfer incomplete: {received} of {expected} bytes")]
    TransferIncomplete { received: u64, expected: u64 },

    /// The obfuscated stream could not be decoded. Fatal for the track;
    /// indicates malformed input.
    #[error("failed to decode audio stream: {0}")]
    Decryption(String),

    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The tagging collaborator rejected the decoded audio.
    #[error("tagging failed: {0}")]
    Tagging(String),
}

impl DownloadError {
    /// Whether this error means "no usable source for this attempt",
    /// making it eligible for fallback resolution.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::GeoBlocked | Self::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(DownloadError::GeoBlocked.is_unavailable());
        assert!(DownloadError::NotFound.is_unavailable());
        assert!(
            !DownloadError::TransferIncomplete {
                received: 10,
                expected: 20
            }
            .is_unavailable()
        );
        assert!(!DownloadError::Decryption("bad length".into()).is_unavailable());
    }
}
