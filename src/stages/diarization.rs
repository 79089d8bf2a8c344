// Diarization stage contract
//
// Produces (start, end, speaker) turns for one chunk. Labels are chunk-local
// identifiers with no cross-chunk identity resolution: the same physical
// speaker may receive different raw labels in different chunks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Device;

use super::StageError;

/// One speaker turn emitted by the diarization engine, chunk-local times
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiarizationTurn {
    pub start: f64,
    pub end: f64,
    pub speaker: String,
}

impl DiarizationTurn {
    pub fn new(start: f64, end: f64, speaker: impl Into<String>) -> Self {
        Self {
            start,
            end,
            speaker: speaker.into(),
        }
    }
}

/// Speaker-diarization engine boundary.
///
/// A failed `diarize` call is a soft failure: every segment of the chunk
/// passes through without a speaker label and the job continues.
#[async_trait]
pub trait Diarizer: Send + Sync {
    /// Load the diarization pipeline onto the configured device. The auth
    /// token comes from the job descriptor and is never persisted.
    async fn warm_up(&self, device: Device, auth_token: &str) -> Result<(), StageError>;

    async fn diarize(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<Vec<DiarizationTurn>, StageError>;
}
