// Stage client contracts
//
// The model-backed stages (transcription, alignment, diarization) and the
// summarization service are external collaborators. This module defines the
// traits the pipeline drives them through, the per-stage error type, and the
// typed outcome that distinguishes "degraded but continuing" from "aborted".

use std::fmt;
use std::sync::Arc;

pub mod alignment;
pub mod diarization;
pub mod summarization;
#[cfg(test)]
pub mod testing;
pub mod transcription;

pub use alignment::Aligner;
pub use diarization::{DiarizationTurn, Diarizer};
pub use summarization::Summarizer;
pub use transcription::{ChunkTranscription, Segment, Transcriber};

/// Error raised by a stage client
#[derive(Debug, Clone)]
pub enum StageError {
    /// Audio decoding or normalization failed
    Preprocessing(String),
    /// Transcription engine failed
    Transcription(String),
    /// Forced alignment failed
    Alignment(String),
    /// Diarization engine failed
    Diarization(String),
    /// Summarization service call failed
    Summarization(String),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Preprocessing(msg) => write!(f, "Preprocessing failed: {}", msg),
            StageError::Transcription(msg) => write!(f, "Transcription failed: {}", msg),
            StageError::Alignment(msg) => write!(f, "Alignment failed: {}", msg),
            StageError::Diarization(msg) => write!(f, "Diarization failed: {}", msg),
            StageError::Summarization(msg) => write!(f, "Summarization failed: {}", msg),
        }
    }
}

impl std::error::Error for StageError {}

/// Result of a stage that is allowed to degrade instead of aborting the job.
///
/// `Degraded` carries the fallback output plus the reason the preferred path
/// was abandoned. Hard failures are plain `Err(StageError)` and abort the job.
#[derive(Debug, Clone)]
pub enum StageOutcome<T> {
    Complete(T),
    Degraded(T, String),
}

impl<T> StageOutcome<T> {
    /// Unwrap the payload, logging the degradation reason if present
    pub fn into_inner(self) -> T {
        match self {
            StageOutcome::Complete(value) => value,
            StageOutcome::Degraded(value, reason) => {
                log::warn!("Stage degraded: {}", reason);
                value
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, StageOutcome::Degraded(..))
    }
}

/// The set of stage clients one worker owns for the lifetime of the process.
///
/// Constructed once at worker startup with an explicit device; the pipeline
/// borrows them for each job.
#[derive(Clone)]
pub struct StageClients {
    pub transcriber: Arc<dyn Transcriber>,
    pub aligner: Arc<dyn Aligner>,
    pub diarizer: Arc<dyn Diarizer>,
    pub summarizer: Arc<dyn Summarizer>,
}
