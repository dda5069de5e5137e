//! quaver - resolve catalog track references into verified audio files
//!
//! The crate takes a provider track descriptor to a correctly named file
//! on disk: a bounded fallback loop over (track, quality) attempts,
//! resumable byte-range transfer into a staging file, reversal of the
//! provider's chunk obfuscation, tagging through an external
//! collaborator, template-driven path rendering, and bounded-concurrency
//! batch orchestration with optional playlist assembly.
//!
//! Catalog lookup, authentication and tagging are consumed through the
//! traits in [`catalog::service`]; implementations live with the caller.

pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod utils;

#[cfg(test)]
mod testutil;

pub use catalog::{AlbumContext, Quality, TrackDescriptor};
pub use config::Config;
pub use download::{BatchOutput, BatchParams, PipelineOutcome, TrackJob, TrackPipeline};
pub use error::DownloadError;
