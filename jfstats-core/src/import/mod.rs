//! Bulk import of exported playback history.

pub mod json;
pub mod latch;
pub mod pipeline;

pub use json::{StreamOutcome, stream_records};
pub use latch::JellystatsLatch;
pub use pipeline::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_TSV_LINE_BYTES, ImportPipeline, detect_tsv};
