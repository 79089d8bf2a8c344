// Audio preprocessing and chunking

pub mod chunking;
pub mod preprocess;

pub use chunking::{split_into_chunks, AudioChunk};
pub use preprocess::{load_wav_mono, PreprocessedAudio};
