// Job store contract
//
// Narrow read/write interface over the persistence backend. The worker is
// the only caller of the mutating progress/terminal methods; the service
// reads and creates.

use anyhow::Result;

use super::model::{ArtifactKind, Job, ProgressUpdate};

/// Durable record of job identity, status and artifacts
pub trait JobStore: Send + Sync {
    fn create_job(&self, job: &Job) -> Result<()>;

    fn get_job(&self, id: &str) -> Result<Option<Job>>;

    /// Transition `queued -> running` and stamp `started_at`
    fn mark_running(&self, id: &str) -> Result<()>;

    /// Record the source audio duration once preprocessing knows it
    fn set_audio_duration(&self, id: &str, seconds: f64) -> Result<()>;

    /// Set the chunk total. Writes only once: later calls on the same job
    /// are ignored.
    fn set_total_chunks(&self, id: &str, total: u32) -> Result<()>;

    /// Push a progress update. The store clamps the percent so it never
    /// decreases within a run.
    fn update_progress(&self, id: &str, update: &ProgressUpdate) -> Result<()>;

    /// Record an artifact file name after its producing stage succeeded
    fn set_artifact(&self, id: &str, kind: ArtifactKind, file_name: &str) -> Result<()>;

    /// Terminal transition `running -> completed`. A job already in a
    /// terminal state is left untouched.
    fn mark_completed(&self, id: &str) -> Result<()>;

    /// Terminal transition to `error` with the captured message. A job
    /// already in a terminal state is left untouched.
    fn mark_error(&self, id: &str, message: &str) -> Result<()>;

    /// Position of a queued job: the count of queued jobs created at or
    /// before it. `None` when the job is not queued.
    fn queue_position(&self, id: &str) -> Result<Option<u32>>;

    fn queued_count(&self) -> Result<u32>;

    fn running_job(&self) -> Result<Option<Job>>;

    /// Average wall-clock duration of completed jobs, if any completed yet
    fn average_job_duration_secs(&self) -> Result<Option<f64>>;

    /// Force every `queued`/`running` job to `error` with the given message.
    /// Called once at process start; returns the number of jobs swept.
    fn recover_orphaned_jobs(&self, message: &str) -> Result<u32>;

    fn delete_job(&self, id: &str) -> Result<()>;

    /// Jobs created before the cutoff (RFC3339), oldest first
    fn jobs_created_before(&self, cutoff: &str) -> Result<Vec<Job>>;
}
