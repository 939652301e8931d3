pub mod queue;
pub mod worker;

pub use queue::{Job, JobQueue, JobReceiver};
pub use worker::Worker;
