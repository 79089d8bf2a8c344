// Audio chunking
//
// Cuts normalized audio into non-overlapping fixed-length chunks. Chunk
// boundaries define the global time offsets later applied to every
// chunk-local timestamp: offset = index * chunk_length_secs.

use super::preprocess::PreprocessedAudio;

/// One fixed-length slice of the source audio.
///
/// The final chunk of a recording may be shorter than the configured length.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub index: u32,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Global start time of this chunk in seconds
    pub offset_seconds: f64,
}

impl AudioChunk {
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Split audio into chunks of `chunk_length_secs`; the last chunk may be shorter.
///
/// For duration D and chunk length L the result holds ceil(D / L) chunks.
pub fn split_into_chunks(audio: &PreprocessedAudio, chunk_length_secs: u32) -> Vec<AudioChunk> {
    let samples_per_chunk = (audio.sample_rate as usize) * (chunk_length_secs as usize);
    if audio.samples.is_empty() || samples_per_chunk == 0 {
        return Vec::new();
    }

    audio
        .samples
        .chunks(samples_per_chunk)
        .enumerate()
        .map(|(index, slice)| AudioChunk {
            index: index as u32,
            samples: slice.to_vec(),
            sample_rate: audio.sample_rate,
            offset_seconds: index as f64 * chunk_length_secs as f64,
        })
        .collect()
}
