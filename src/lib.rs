// meetscribe: turns uploaded meeting recordings into a speaker-attributed
// conversation transcript and LLM-generated meeting minutes.
//
// Jobs move through a persistent SQLite-backed lifecycle (queued -> running
// -> completed/error) and are processed one at a time by a single worker
// that chunks the audio and drives the transcription, alignment,
// diarization and summarization stages.

pub mod artifacts;
pub mod audio;
pub mod config;
pub mod jobs;
pub mod pipeline;
pub mod service;
pub mod stages;

pub use config::{AppConfig, Device};
pub use jobs::{spawn_worker, JobCredentials, JobStatus, Worker};
pub use service::{bootstrap, JobService, JobStatusReport, QueueStatusReport, ServiceError};
pub use stages::StageClients;

/// Current UTC time as RFC 3339 text, the canonical timestamp format of the
/// job store. Microsecond precision keeps the strings lexicographically
/// ordered, which the store's queue-position and retention queries rely on.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Initialize env_logger with a sensible default filter.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_rfc3339_is_lexicographically_ordered() {
        let earlier = now_rfc3339();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let later = now_rfc3339();
        assert!(earlier < later);
    }
}
