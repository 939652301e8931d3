use anyhow::Result;
use tokio::sync::mpsc;

use crate::types::{CrossingId, ReportId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    GenerateReport { report_id: ReportId },
    RunCrossing { crossing_id: CrossingId },
}

pub type JobReceiver = mpsc::UnboundedReceiver<Job>;

/// Cloneable producer handle. The API enqueues, the worker owns the single
/// receiver, so jobs run strictly one at a time per worker.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl JobQueue {
    pub fn new() -> (Self, JobReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, job: Job) -> Result<()> {
        self.tx
            .send(job)
            .map_err(|_| anyhow::anyhow!("job queue closed, worker gone"))
    }
}
