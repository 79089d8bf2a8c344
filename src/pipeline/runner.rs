// Chunk pipeline runner
//
// Drives one job from decoded audio to its two artifacts. Chunks are
// processed strictly in order; transcription failure aborts the job while
// alignment, diarization and summarization degrade per chunk or per stage.
// Every state change is pushed into the job store so pollers observe
// progress without touching the pipeline.

use anyhow::Result;
use log::{debug, info};

use crate::artifacts;
use crate::audio::{load_wav_mono, split_into_chunks, AudioChunk};
use crate::config::AppConfig;
use crate::jobs::model::{ArtifactKind, JobDescriptor, ProgressUpdate};
use crate::jobs::store::JobStore;
use crate::stages::summarization::MINUTES_UNAVAILABLE_PLACEHOLDER;
use crate::stages::{Segment, StageClients, StageError, StageOutcome};

use super::assembler::{assemble_transcript, detect_language_safe, EMPTY_TRANSCRIPT_TEXT};
use super::merge::assign_speakers;
use super::progress::{ProgressEstimator, ProgressSnapshot, Stage};

/// Runs the per-job pipeline against a store and a set of stage clients
pub struct ChunkPipeline<'a> {
    store: &'a dyn JobStore,
    stages: &'a StageClients,
    config: &'a AppConfig,
}

impl<'a> ChunkPipeline<'a> {
    pub fn new(store: &'a dyn JobStore, stages: &'a StageClients, config: &'a AppConfig) -> Self {
        Self {
            store,
            stages,
            config,
        }
    }

    /// Run one job to completion.
    ///
    /// Returns `Err` only for hard failures; the caller records those into
    /// the job and moves on. On `Ok` the job has been marked completed with
    /// both artifacts registered.
    pub async fn run(&self, descriptor: &JobDescriptor) -> Result<()> {
        let job_id = &descriptor.job_id;
        let mut estimator = ProgressEstimator::new();

        self.push(job_id, &estimator.stage_snapshot(Stage::Preprocessing))?;
        let audio = load_wav_mono(&descriptor.audio_path, self.config.sample_rate)
            .map_err(|e| StageError::Preprocessing(format!("{:#}", e)))?;
        self.store.set_audio_duration(job_id, audio.duration_seconds())?;

        let chunks = split_into_chunks(&audio, self.config.chunk_length_secs);
        self.store.set_total_chunks(job_id, chunks.len() as u32)?;
        info!(
            "Job {}: {:.1}s of audio, {} chunk(s) of {}s",
            job_id,
            audio.duration_seconds(),
            chunks.len(),
            self.config.chunk_length_secs
        );

        self.push(job_id, &estimator.stage_snapshot(Stage::WarmUp))?;
        self.stages.transcriber.warm_up(self.config.device).await?;
        self.stages
            .diarizer
            .warm_up(self.config.device, &descriptor.credentials.diarization_token)
            .await?;

        estimator.begin_chunks(chunks.len() as u32);
        let mut all_segments = Vec::new();
        for chunk in &chunks {
            let segments = self.process_chunk(job_id, chunk).await?;
            for mut segment in segments {
                segment.start += chunk.offset_seconds;
                segment.end += chunk.offset_seconds;
                all_segments.push(segment);
            }
            self.push(job_id, &estimator.chunk_done())?;
        }

        self.push(job_id, &estimator.stage_snapshot(Stage::Finalizing))?;

        let transcript = if all_segments.is_empty() {
            info!("Job {}: no speech detected in any chunk", job_id);
            EMPTY_TRANSCRIPT_TEXT.to_string()
        } else {
            assemble_transcript(all_segments)
        };

        let transcript_name = artifacts::transcript_file_name(job_id);
        artifacts::write_artifact(&self.config.outputs_dir(), &transcript_name, &transcript)?;
        self.store
            .set_artifact(job_id, ArtifactKind::Conversation, &transcript_name)?;

        let minutes = self
            .summarize(&transcript, &descriptor.credentials.llm_api_key)
            .await
            .into_inner();
        let minutes_name = artifacts::minutes_file_name(job_id);
        artifacts::write_artifact(&self.config.outputs_dir(), &minutes_name, &minutes)?;
        self.store
            .set_artifact(job_id, ArtifactKind::Minutes, &minutes_name)?;

        self.store.mark_completed(job_id)?;
        Ok(())
    }

    /// Run the per-chunk stages. Timestamps in the returned segments are
    /// still chunk-local.
    async fn process_chunk(&self, job_id: &str, chunk: &AudioChunk) -> Result<Vec<Segment>> {
        let transcription = self
            .stages
            .transcriber
            .transcribe(&chunk.samples, chunk.sample_rate)
            .await?;

        if transcription.segments.is_empty() {
            debug!("Job {}: chunk {} contains no speech", job_id, chunk.index);
            return Ok(Vec::new());
        }

        let aligned = match self
            .align_chunk(chunk, &transcription.segments, &transcription.language)
            .await
        {
            StageOutcome::Complete(segments) => segments,
            // On alignment failure the chunk contributes its raw
            // transcription segments and skips diarization entirely.
            outcome @ StageOutcome::Degraded(..) => return Ok(outcome.into_inner()),
        };

        Ok(self.diarize_chunk(chunk, aligned).await.into_inner())
    }

    async fn align_chunk(
        &self,
        chunk: &AudioChunk,
        segments: &[Segment],
        chunk_language: &str,
    ) -> StageOutcome<Vec<Segment>> {
        match self
            .stages
            .aligner
            .align(segments, &chunk.samples, chunk.sample_rate, chunk_language)
            .await
        {
            Ok(mut aligned) => {
                // Re-detect per segment; alignment can split or reflow text.
                for segment in &mut aligned {
                    let language = if segment.text.trim().is_empty() {
                        chunk_language.to_string()
                    } else {
                        detect_language_safe(&segment.text).to_string()
                    };
                    segment.language = Some(language);
                }
                StageOutcome::Complete(aligned)
            }
            Err(e) => StageOutcome::Degraded(
                segments.to_vec(),
                format!("alignment failed for chunk {}: {}", chunk.index, e),
            ),
        }
    }

    async fn diarize_chunk(
        &self,
        chunk: &AudioChunk,
        mut segments: Vec<Segment>,
    ) -> StageOutcome<Vec<Segment>> {
        match self
            .stages
            .diarizer
            .diarize(&chunk.samples, chunk.sample_rate)
            .await
        {
            Ok(turns) => {
                assign_speakers(&mut segments, &turns);
                StageOutcome::Complete(segments)
            }
            Err(e) => StageOutcome::Degraded(
                segments,
                format!("diarization failed for chunk {}: {}", chunk.index, e),
            ),
        }
    }

    async fn summarize(&self, transcript: &str, api_key: &str) -> StageOutcome<String> {
        match self.stages.summarizer.summarize(transcript, api_key).await {
            Ok(minutes) => StageOutcome::Complete(minutes),
            Err(e) => StageOutcome::Degraded(
                MINUTES_UNAVAILABLE_PLACEHOLDER.to_string(),
                format!("summarization failed, writing placeholder minutes: {}", e),
            ),
        }
    }

    fn push(&self, job_id: &str, snapshot: &ProgressSnapshot) -> Result<()> {
        self.store.update_progress(
            job_id,
            &ProgressUpdate {
                stage: snapshot.stage.label().to_string(),
                percent: snapshot.percent,
                current_chunk: snapshot.current_chunk,
                eta_seconds: snapshot.eta_seconds,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::model::{Job, JobCredentials, JobStatus};
    use crate::jobs::sqlite::SqliteJobStore;
    use crate::stages::testing::{test_clients, StageScript};
    use crate::stages::DiarizationTurn;
    use tempfile::tempdir;

    fn write_wav(path: &std::path::Path, seconds: f64, sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..((seconds * sample_rate as f64) as usize) {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    struct Harness {
        _dir: tempfile::TempDir,
        config: AppConfig,
        store: SqliteJobStore,
        descriptor: JobDescriptor,
    }

    /// Build a store, a 2.5s recording (3 chunks at 1s) and a queued job
    fn harness() -> Harness {
        let dir = tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            chunk_length_secs: 1,
            sample_rate: 8_000,
            ..AppConfig::default()
        };
        let store = SqliteJobStore::new(config.db_path()).unwrap();

        let audio_path = dir.path().join("meeting.wav");
        write_wav(&audio_path, 2.5, 8_000);
        store
            .create_job(&Job::new("job1".to_string(), "meeting.wav".to_string(), None))
            .unwrap();
        store.mark_running("job1").unwrap();

        let descriptor = JobDescriptor {
            job_id: "job1".to_string(),
            audio_path,
            credentials: JobCredentials {
                diarization_token: "token".to_string(),
                llm_api_key: "key".to_string(),
            },
        };

        Harness {
            _dir: dir,
            config,
            store,
            descriptor,
        }
    }

    async fn run(h: &Harness, script: StageScript) -> Result<()> {
        let clients = test_clients(script);
        ChunkPipeline::new(&h.store, &clients, &h.config)
            .run(&h.descriptor)
            .await
    }

    fn read_artifact(h: &Harness, name: &str) -> String {
        let bytes = artifacts::read_artifact(&h.config.outputs_dir(), name)
            .unwrap()
            .unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_full_run_shifts_timestamps_and_labels_speakers() {
        let h = harness();
        let script = StageScript::default()
            .with_segments(vec![
                vec![Segment::new(0.1, 0.9, "first chunk")],
                vec![Segment::new(0.2, 0.8, "second chunk")],
                vec![],
            ])
            .with_turns(vec![DiarizationTurn::new(0.0, 1.0, "SPEAKER_00")])
            .with_minutes("the minutes");

        run(&h, script).await.unwrap();

        let job = h.store.get_job("job1").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.total_chunks, 3);
        assert_eq!(job.progress_percent, 100);
        assert_eq!(job.audio_duration_seconds, Some(2.5));

        let transcript = read_artifact(&h, &job.transcript_file.unwrap());
        // Second chunk's times carry the 1s offset
        assert!(transcript.contains("[en][0.10:0.90] Speaker 1: first chunk"));
        assert!(transcript.contains("[en][1.20:1.80] Speaker 1: second chunk"));

        let minutes = read_artifact(&h, &job.minutes_file.unwrap());
        assert_eq!(minutes, "the minutes");
    }

    #[tokio::test]
    async fn test_transcription_failure_aborts_the_job() {
        let h = harness();
        let script = StageScript::default().with_transcription_failure("engine crashed");

        let err = run(&h, script).await.unwrap_err();
        assert!(err.to_string().contains("engine crashed"));

        // The runner leaves the terminal transition to its caller
        let job = h.store.get_job("job1").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.transcript_file.is_none());
    }

    #[tokio::test]
    async fn test_alignment_failure_falls_back_to_raw_segments() {
        let h = harness();
        let script = StageScript::default()
            .with_segments(vec![
                vec![Segment::new(0.0, 0.9, "still transcribed")],
                vec![],
                vec![],
            ])
            .with_alignment_failure("aligner down")
            .with_turns(vec![DiarizationTurn::new(0.0, 1.0, "SPEAKER_00")]);

        run(&h, script).await.unwrap();

        let job = h.store.get_job("job1").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        // Raw segments survive, but without speaker attribution
        let transcript = read_artifact(&h, &job.transcript_file.unwrap());
        assert!(transcript.contains("Speaker 1: still transcribed"));
        assert!(!transcript.contains("SPEAKER_00"));
    }

    #[tokio::test]
    async fn test_diarization_failure_keeps_segments_unlabeled() {
        let h = harness();
        let script = StageScript::default()
            .with_segments(vec![vec![Segment::new(0.0, 0.9, "hello there")], vec![], vec![]])
            .with_diarization_failure("no token");

        run(&h, script).await.unwrap();

        let job = h.store.get_job("job1").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        // Unlabeled segments still get a stable per-transcript number
        let transcript = read_artifact(&h, &job.transcript_file.unwrap());
        assert!(transcript.contains("Speaker 1: hello there"));
    }

    #[tokio::test]
    async fn test_summarization_failure_completes_with_placeholder() {
        let h = harness();
        let script = StageScript::default()
            .with_segments(vec![vec![Segment::new(0.0, 0.9, "content")], vec![], vec![]])
            .with_summarization_failure("timeout");

        run(&h, script).await.unwrap();

        let job = h.store.get_job("job1").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        let minutes = read_artifact(&h, &job.minutes_file.unwrap());
        assert_eq!(minutes, MINUTES_UNAVAILABLE_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_silent_recording_completes_with_empty_marker() {
        let h = harness();
        let script = StageScript::default().with_minutes("minutes of silence");

        run(&h, script).await.unwrap();

        let job = h.store.get_job("job1").unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);

        let transcript = read_artifact(&h, &job.transcript_file.unwrap());
        assert_eq!(transcript, EMPTY_TRANSCRIPT_TEXT);
        // The empty marker is still summarized
        let minutes = read_artifact(&h, &job.minutes_file.unwrap());
        assert_eq!(minutes, "minutes of silence");
    }
}
