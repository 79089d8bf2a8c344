// Sequential job queue
//
// FIFO channel between submission and the single worker. Enqueueing never
// blocks the caller; ordering and position reporting live in the store,
// which tracks creation timestamps.

use anyhow::{anyhow, Result};
use log::info;
use tokio::sync::mpsc;

use super::model::JobDescriptor;

/// Submission side of the queue
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::UnboundedSender<JobDescriptor>,
}

/// Create the queue pair: the service keeps the `JobQueue`, the worker
/// consumes the receiver.
pub fn job_queue() -> (JobQueue, mpsc::UnboundedReceiver<JobDescriptor>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (JobQueue { sender }, receiver)
}

impl JobQueue {
    /// Hand a descriptor to the worker without blocking.
    ///
    /// Fails only when the worker has shut down and dropped the receiver.
    pub fn enqueue(&self, descriptor: JobDescriptor) -> Result<()> {
        let job_id = descriptor.job_id.clone();
        self.sender
            .send(descriptor)
            .map_err(|_| anyhow!("Worker is not running; queue is closed"))?;

        info!("Job {} enqueued", job_id);
        Ok(())
    }
}
