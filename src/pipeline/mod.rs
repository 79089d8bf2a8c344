// Per-job processing pipeline

pub mod assembler;
pub mod merge;
pub mod progress;
pub mod runner;

pub use assembler::{assemble_transcript, EMPTY_TRANSCRIPT_TEXT};
pub use merge::{assign_speakers, UNKNOWN_SPEAKER};
pub use progress::{ProgressEstimator, Stage};
pub use runner::ChunkPipeline;
