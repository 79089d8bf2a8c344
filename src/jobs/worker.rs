// Job worker
//
// The single consumer of the processing queue. Exactly one worker exists per
// process, so at most one pipeline runs at a time and the shared
// acceleration resource is never oversubscribed. A failed job is captured
// into its record and the worker moves on to the next descriptor.

use log::{error, info};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::pipeline::ChunkPipeline;
use crate::stages::StageClients;

use super::model::JobDescriptor;
use super::store::JobStore;

/// Single-consumer worker driving the chunk pipeline
pub struct Worker {
    store: Arc<dyn JobStore>,
    stages: StageClients,
    config: AppConfig,
    receiver: mpsc::UnboundedReceiver<JobDescriptor>,
}

impl Worker {
    pub fn new(
        store: Arc<dyn JobStore>,
        stages: StageClients,
        config: AppConfig,
        receiver: mpsc::UnboundedReceiver<JobDescriptor>,
    ) -> Self {
        Self {
            store,
            stages,
            config,
            receiver,
        }
    }

    /// Drain the queue until every sender is gone.
    ///
    /// Jobs run to a terminal state once dequeued; there is no cancellation
    /// and no retry.
    pub async fn run(mut self) {
        info!("Worker started (device: {})", self.config.device);

        while let Some(descriptor) = self.receiver.recv().await {
            self.process(descriptor).await;
        }

        info!("Queue closed, worker shutting down");
    }

    async fn process(&self, descriptor: JobDescriptor) {
        let job_id = descriptor.job_id.clone();
        info!("Dequeued job {}", job_id);

        if let Err(e) = self.store.mark_running(&job_id) {
            error!("Failed to mark job {} running: {:#}", job_id, e);
            return;
        }

        let pipeline = ChunkPipeline::new(self.store.as_ref(), &self.stages, &self.config);

        match pipeline.run(&descriptor).await {
            Ok(()) => {
                info!("Job {} completed", job_id);
            }
            Err(e) => {
                error!("Job {} failed: {:#}", job_id, e);
                if let Err(store_err) = self.store.mark_error(&job_id, &format!("{:#}", e)) {
                    error!(
                        "Failed to record error for job {}: {:#}",
                        job_id, store_err
                    );
                }
            }
        }
    }
}

/// Spawn the worker onto the runtime
pub fn spawn_worker(worker: Worker) -> tokio::task::JoinHandle<()> {
    tokio::spawn(worker.run())
}
