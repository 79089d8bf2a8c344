// Job lifecycle, queue, store and worker

pub mod model;
pub mod queue;
pub mod sqlite;
pub mod store;
pub mod worker;

pub use model::{
    ArtifactKind, Job, JobCredentials, JobDescriptor, JobStatus, ProgressUpdate,
    RESTART_ERROR_MESSAGE,
};
pub use queue::{job_queue, JobQueue};
pub use sqlite::SqliteJobStore;
pub use store::JobStore;
pub use worker::{spawn_worker, Worker};
