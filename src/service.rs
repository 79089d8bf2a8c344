// Job service facade
//
// The outer surface callers drive: submission, status polling, artifact
// download, queue inspection, deletion and retention cleanup. Owns the
// store and the producer half of the queue; the worker owns the consumer
// half.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use crate::artifacts;
use crate::config::AppConfig;
use crate::jobs::model::{
    ArtifactKind, Job, JobCredentials, JobDescriptor, JobStatus, RESTART_ERROR_MESSAGE,
};
use crate::jobs::queue::{job_queue, JobQueue};
use crate::jobs::sqlite::{retention_cutoff, SqliteJobStore};
use crate::jobs::store::JobStore;
use crate::jobs::worker::Worker;
use crate::stages::StageClients;

/// Error surfaced to service callers
#[derive(Debug)]
pub enum ServiceError {
    /// The request itself was invalid
    Input(String),
    /// The referenced job or artifact does not exist
    NotFound(String),
    /// Storage or filesystem failure
    Internal(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Input(msg) => write!(f, "Invalid request: {}", msg),
            ServiceError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ServiceError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<anyhow::Error> for ServiceError {
    fn from(e: anyhow::Error) -> Self {
        ServiceError::Internal(format!("{:#}", e))
    }
}

/// Snapshot of one job, shaped for status polling
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusReport {
    pub id: String,
    pub status: JobStatus,
    pub stage: String,
    pub progress_percent: u32,
    pub current_chunk: u32,
    pub total_chunks: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<u64>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_duration_seconds: Option<f64>,
    /// 1-based position among queued jobs; only set while queued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
}

/// Currently running job, as shown in the queue overview
#[derive(Debug, Clone, Serialize)]
pub struct RunningJobSummary {
    pub id: String,
    pub stage: String,
    pub progress_percent: u32,
}

/// Queue overview with a coarse wait estimate
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatusReport {
    pub queue_length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running: Option<RunningJobSummary>,
    pub estimated_wait_seconds: u64,
}

/// Wire the store, queue, worker and recovery sweep together.
///
/// Called once at process startup. Jobs that were queued or running when
/// the previous process died are marked as errored here, before the worker
/// starts consuming.
pub fn bootstrap(config: AppConfig, stages: StageClients) -> anyhow::Result<(JobService, Worker)> {
    std::fs::create_dir_all(config.uploads_dir())?;
    std::fs::create_dir_all(config.outputs_dir())?;

    let store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::new(config.db_path())?);

    let swept = store.recover_orphaned_jobs(RESTART_ERROR_MESSAGE)?;
    if swept > 0 {
        warn!("Recovery sweep marked {} interrupted job(s) as errored", swept);
    }

    let (queue, receiver) = job_queue();
    let worker = Worker::new(store.clone(), stages, config.clone(), receiver);
    let service = JobService::new(store, queue, config);

    Ok((service, worker))
}

/// Public entry point for job submission and inspection
pub struct JobService {
    store: Arc<dyn JobStore>,
    queue: JobQueue,
    config: AppConfig,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>, queue: JobQueue, config: AppConfig) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    /// Accept a recording, persist the queued job and hand it to the worker.
    ///
    /// The audio file is copied into the uploads directory under an
    /// id-prefixed name before the job becomes visible, so the worker never
    /// races the caller's file handle. Returns the new job id.
    pub fn submit(
        &self,
        audio_path: &Path,
        credentials: JobCredentials,
        owner: Option<String>,
    ) -> Result<String, ServiceError> {
        if credentials.diarization_token.trim().is_empty() {
            return Err(ServiceError::Input(
                "diarization token must not be empty".to_string(),
            ));
        }
        if credentials.llm_api_key.trim().is_empty() {
            return Err(ServiceError::Input(
                "LLM API key must not be empty".to_string(),
            ));
        }
        if !audio_path.is_file() {
            return Err(ServiceError::Input(format!(
                "audio file not found: {}",
                audio_path.display()
            )));
        }
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ServiceError::Input("audio file has no usable name".to_string()))?;

        let job_id = uuid::Uuid::new_v4().simple().to_string();
        let stored_name = format!("{}_{}", job_id, file_name);
        let stored_path = self.config.uploads_dir().join(&stored_name);

        std::fs::create_dir_all(self.config.uploads_dir())
            .map_err(|e| ServiceError::Internal(format!("Failed to create uploads dir: {}", e)))?;
        std::fs::copy(audio_path, &stored_path)
            .map_err(|e| ServiceError::Internal(format!("Failed to store audio: {}", e)))?;

        self.store
            .create_job(&Job::new(job_id.clone(), stored_name, owner))?;

        let descriptor = JobDescriptor {
            job_id: job_id.clone(),
            audio_path: stored_path,
            credentials,
        };
        if let Err(e) = self.queue.enqueue(descriptor) {
            // The worker is gone; fail the record rather than strand it
            self.store
                .mark_error(&job_id, "Processing queue is unavailable")?;
            return Err(ServiceError::Internal(format!("{:#}", e)));
        }

        info!("Accepted job {}", job_id);
        Ok(job_id)
    }

    /// Current state of one job
    pub fn status(&self, job_id: &str) -> Result<JobStatusReport, ServiceError> {
        let job = self.require_job(job_id)?;

        let queue_position = if job.status == JobStatus::Queued {
            self.store.queue_position(job_id)?
        } else {
            None
        };

        Ok(JobStatusReport {
            id: job.id,
            status: job.status,
            stage: job.stage,
            progress_percent: job.progress_percent,
            current_chunk: job.current_chunk,
            total_chunks: job.total_chunks,
            eta_seconds: job.eta_seconds,
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
            error_message: job.error_message,
            transcript_file: job.transcript_file,
            minutes_file: job.minutes_file,
            audio_duration_seconds: job.audio_duration_seconds,
            queue_position,
        })
    }

    /// Fetch one artifact's file name and bytes
    pub fn download(
        &self,
        job_id: &str,
        kind: ArtifactKind,
    ) -> Result<(String, Vec<u8>), ServiceError> {
        let job = self.require_job(job_id)?;

        let file_name = match kind {
            ArtifactKind::Conversation => job.transcript_file,
            ArtifactKind::Minutes => job.minutes_file,
        }
        .ok_or_else(|| {
            ServiceError::NotFound(format!("job {} has no such artifact yet", job_id))
        })?;

        let bytes = artifacts::read_artifact(&self.config.outputs_dir(), &file_name)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("artifact file missing: {}", file_name))
            })?;

        Ok((file_name, bytes))
    }

    /// Queue overview.
    ///
    /// The wait estimate is queued jobs times the average completed-job
    /// duration, plus the remaining share of the running job. Before any
    /// job has completed, a configured default duration stands in for the
    /// average.
    pub fn queue_status(&self) -> Result<QueueStatusReport, ServiceError> {
        let queue_length = self.store.queued_count()?;
        let running = self.store.running_job()?;

        let average = self
            .store
            .average_job_duration_secs()?
            .unwrap_or(self.config.default_job_duration_secs as f64);

        let mut wait = queue_length as f64 * average;
        if let Some(job) = &running {
            let remaining = 1.0 - (job.progress_percent.min(100) as f64 / 100.0);
            wait += average * remaining;
        }

        Ok(QueueStatusReport {
            queue_length,
            running: running.map(|job| RunningJobSummary {
                id: job.id,
                stage: job.stage,
                progress_percent: job.progress_percent,
            }),
            estimated_wait_seconds: wait.round().max(0.0) as u64,
        })
    }

    /// Remove a job's record, uploaded audio and artifacts
    pub fn delete(&self, job_id: &str) -> Result<(), ServiceError> {
        let job = self.require_job(job_id)?;
        self.remove_job_files(&job)?;
        self.store.delete_job(job_id)?;
        info!("Deleted job {}", job_id);
        Ok(())
    }

    /// Remove every job older than the retention window, with its files.
    /// Returns the number of jobs removed.
    pub fn cleanup_expired(&self) -> Result<u32, ServiceError> {
        let cutoff = retention_cutoff(self.config.retention_days);
        let expired = self.store.jobs_created_before(&cutoff)?;

        let mut removed = 0;
        for job in expired {
            let id = job.id.clone();
            self.remove_job_files(&job)?;
            self.store.delete_job(&id)?;
            removed += 1;
        }

        if removed > 0 {
            info!("Retention cleanup removed {} job(s)", removed);
        }
        Ok(removed)
    }

    fn require_job(&self, job_id: &str) -> Result<Job, ServiceError> {
        self.store
            .get_job(job_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("no job with id {}", job_id)))
    }

    fn remove_job_files(&self, job: &Job) -> Result<(), ServiceError> {
        let outputs = self.config.outputs_dir();
        for file_name in [&job.transcript_file, &job.minutes_file]
            .into_iter()
            .flatten()
        {
            artifacts::remove_file_if_exists(&outputs.join(file_name))?;
        }
        artifacts::remove_file_if_exists(&self.config.uploads_dir().join(&job.audio_file))?;
        Ok(())
    }
}
