//! Track transfer pipeline: cipher, transfer, fallback, batch queue

pub mod cipher;
pub mod fallback;
pub mod pipeline;
pub mod queue;
pub mod transfer;

pub use pipeline::{PipelineOutcome, TrackJob, TrackPipeline};
pub use queue::{BatchOutput, BatchParams, BatchReport, download_batch, download_reference, run_batch};
pub use transfer::TransferManager;
