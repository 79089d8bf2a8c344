// Scripted stage clients for pipeline and worker tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::Device;

use super::{
    Aligner, ChunkTranscription, DiarizationTurn, Diarizer, Segment, StageClients, StageError,
    Summarizer, Transcriber,
};

/// Scripted behavior shared by all four mock clients.
///
/// `segments` is indexed by transcription call order; calls past the end of
/// the script return empty chunks. Any `fail_*` message turns the matching
/// stage into a failure.
#[derive(Clone)]
pub struct StageScript {
    pub segments: Vec<Vec<Segment>>,
    pub language: String,
    pub turns: Vec<DiarizationTurn>,
    pub minutes: String,
    pub fail_transcription: Option<String>,
    pub fail_alignment: Option<String>,
    pub fail_diarization: Option<String>,
    pub fail_summarization: Option<String>,
}

impl Default for StageScript {
    fn default() -> Self {
        Self {
            segments: Vec::new(),
            language: "en".to_string(),
            turns: Vec::new(),
            minutes: "minutes".to_string(),
            fail_transcription: None,
            fail_alignment: None,
            fail_diarization: None,
            fail_summarization: None,
        }
    }
}

impl StageScript {
    pub fn with_segments(mut self, segments: Vec<Vec<Segment>>) -> Self {
        self.segments = segments;
        self
    }

    pub fn with_turns(mut self, turns: Vec<DiarizationTurn>) -> Self {
        self.turns = turns;
        self
    }

    pub fn with_minutes(mut self, minutes: &str) -> Self {
        self.minutes = minutes.to_string();
        self
    }

    pub fn with_transcription_failure(mut self, message: &str) -> Self {
        self.fail_transcription = Some(message.to_string());
        self
    }

    pub fn with_alignment_failure(mut self, message: &str) -> Self {
        self.fail_alignment = Some(message.to_string());
        self
    }

    pub fn with_diarization_failure(mut self, message: &str) -> Self {
        self.fail_diarization = Some(message.to_string());
        self
    }

    pub fn with_summarization_failure(mut self, message: &str) -> Self {
        self.fail_summarization = Some(message.to_string());
        self
    }
}

/// Build a full set of stage clients driven by one script
pub fn test_clients(script: StageScript) -> StageClients {
    let script = Arc::new(script);
    StageClients {
        transcriber: Arc::new(ScriptedTranscriber {
            script: script.clone(),
            calls: Mutex::new(0),
        }),
        aligner: Arc::new(ScriptedAligner {
            script: script.clone(),
        }),
        diarizer: Arc::new(ScriptedDiarizer {
            script: script.clone(),
        }),
        summarizer: Arc::new(ScriptedSummarizer { script }),
    }
}

struct ScriptedTranscriber {
    script: Arc<StageScript>,
    calls: Mutex<usize>,
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn warm_up(&self, _device: Device) -> Result<(), StageError> {
        Ok(())
    }

    async fn transcribe(
        &self,
        _samples: &[f32],
        _sample_rate: u32,
    ) -> Result<ChunkTranscription, StageError> {
        if let Some(message) = &self.script.fail_transcription {
            return Err(StageError::Transcription(message.clone()));
        }

        let mut calls = self.calls.lock().unwrap();
        let segments = self.script.segments.get(*calls).cloned().unwrap_or_default();
        *calls += 1;

        Ok(ChunkTranscription {
            language: self.script.language.clone(),
            segments,
        })
    }
}

struct ScriptedAligner {
    script: Arc<StageScript>,
}

#[async_trait]
impl Aligner for ScriptedAligner {
    async fn align(
        &self,
        segments: &[Segment],
        _samples: &[f32],
        _sample_rate: u32,
        _language: &str,
    ) -> Result<Vec<Segment>, StageError> {
        if let Some(message) = &self.script.fail_alignment {
            return Err(StageError::Alignment(message.clone()));
        }
        Ok(segments.to_vec())
    }
}

struct ScriptedDiarizer {
    script: Arc<StageScript>,
}

#[async_trait]
impl Diarizer for ScriptedDiarizer {
    async fn warm_up(&self, _device: Device, _auth_token: &str) -> Result<(), StageError> {
        Ok(())
    }

    async fn diarize(
        &self,
        _samples: &[f32],
        _sample_rate: u32,
    ) -> Result<Vec<DiarizationTurn>, StageError> {
        if let Some(message) = &self.script.fail_diarization {
            return Err(StageError::Diarization(message.clone()));
        }
        Ok(self.script.turns.clone())
    }
}

struct ScriptedSummarizer {
    script: Arc<StageScript>,
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(
        &self,
        _transcript_text: &str,
        _api_key: &str,
    ) -> Result<String, StageError> {
        if let Some(message) = &self.script.fail_summarization {
            return Err(StageError::Summarization(message.clone()));
        }
        Ok(self.script.minutes.clone())
    }
}
