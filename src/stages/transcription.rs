// Transcription stage contract
//
// One call per chunk: mono PCM samples in, detected language plus raw
// segments out. Timestamps are chunk-local; the pipeline shifts them onto
// the global timeline after the per-chunk stages finish.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Device;

use super::StageError;

/// One transcribed utterance.
///
/// `start`/`end` are chunk-local seconds until offset reconciliation, global
/// afterwards. `speaker` is filled by the diarization merge; it stays `None`
/// when the diarization stage failed for the chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    /// Language detected for this segment's text. Informational only: the
    /// transcript renderer re-detects per line from the text itself.
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            language: None,
            speaker: None,
        }
    }
}

/// Transcription output for a single chunk
#[derive(Debug, Clone)]
pub struct ChunkTranscription {
    /// Language the engine detected for the chunk as a whole
    pub language: String,
    pub segments: Vec<Segment>,
}

/// Speech-recognition engine boundary.
///
/// A failed `transcribe` call is a hard failure: the job transitions to
/// `error`. An empty segment list is not an error; the chunk simply
/// contributes nothing.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Load the model onto the configured device. Called once per job,
    /// before the first chunk.
    async fn warm_up(&self, device: Device) -> Result<(), StageError>;

    async fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<ChunkTranscription, StageError>;
}
