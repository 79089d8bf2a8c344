// Job models
//
// A job is the durable record of one submitted recording. The worker is the
// only writer while it owns the job; submission creates it and pollers only
// read.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Error message written to every job found `queued` or `running` at startup.
///
/// The in-memory queue and the per-job credentials do not survive a restart,
/// so interrupted jobs cannot be resumed. This is an intentional data-loss
/// boundary.
pub const RESTART_ERROR_MESSAGE: &str =
    "Processing was interrupted by a server restart. Please resubmit the recording.";

/// Job lifecycle states. Transitions are strictly forward:
/// `queued -> running -> {completed | error}`, plus `queued -> error` via
/// the startup recovery sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "queued" => Some(JobStatus::Queued),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "error" => Some(JobStatus::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The two downloadable artifacts of a completed job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Conversation,
    Minutes,
}

/// A job record as persisted in the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// Human-readable label of the stage currently running
    pub stage: String,
    pub progress_percent: u32,
    pub current_chunk: u32,
    /// Set exactly once, before any chunk begins
    pub total_chunks: u32,
    pub eta_seconds: Option<u64>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    /// Present only in `error` status
    pub error_message: Option<String>,
    /// Artifact file names, populated only after the producing stage succeeds
    pub transcript_file: Option<String>,
    pub minutes_file: Option<String>,
    pub audio_duration_seconds: Option<f64>,
    /// Uploaded source audio, relative to the uploads directory
    pub audio_file: String,
    pub owner: Option<String>,
}

impl Job {
    pub fn new(id: String, audio_file: String, owner: Option<String>) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            stage: "queued".to_string(),
            progress_percent: 0,
            current_chunk: 0,
            total_chunks: 0,
            eta_seconds: None,
            created_at: crate::now_rfc3339(),
            started_at: None,
            finished_at: None,
            error_message: None,
            transcript_file: None,
            minutes_file: None,
            audio_duration_seconds: None,
            audio_file,
            owner,
        }
    }
}

/// Progress fields the pipeline pushes into the store after every change
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub stage: String,
    pub percent: u32,
    pub current_chunk: u32,
    pub eta_seconds: Option<u64>,
}

/// Per-job service credentials.
///
/// These live only in the in-memory queue descriptor and are never written
/// to the store; a restart discards them.
#[derive(Clone)]
pub struct JobCredentials {
    /// Token for loading the gated diarization model
    pub diarization_token: String,
    /// API key for the summarization service
    pub llm_api_key: String,
}

impl fmt::Debug for JobCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobCredentials")
            .field("diarization_token", &"<redacted>")
            .field("llm_api_key", &"<redacted>")
            .finish()
    }
}

/// Queue entry handed from submission to the worker
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    pub job_id: String,
    /// Absolute path of the uploaded source audio
    pub audio_path: PathBuf,
    pub credentials: JobCredentials,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in [
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Error,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("done"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }

    #[test]
    fn test_new_job_starts_queued_with_zero_progress() {
        let job = Job::new("abc".to_string(), "abc_audio.wav".to_string(), None);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress_percent, 0);
        assert_eq!(job.total_chunks, 0);
        assert!(job.started_at.is_none());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = JobCredentials {
            diarization_token: "hf_secret".to_string(),
            llm_api_key: "key_secret".to_string(),
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("secret"));
    }
}
