// Forced-alignment stage contract
//
// Refines segment time boundaries against the audio signal using the
// language detected by transcription. Alignment failure is a soft failure
// local to one chunk: the pipeline falls back to the unaligned segments.

use async_trait::async_trait;

use super::{Segment, StageError};

/// Forced-alignment engine boundary
#[async_trait]
pub trait Aligner: Send + Sync {
    async fn align(
        &self,
        segments: &[Segment],
        samples: &[f32],
        sample_rate: u32,
        language: &str,
    ) -> Result<Vec<Segment>, StageError>;
}
