//! Scheduler errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler '{0}' needs at least one slot")]
    ZeroSlots(String),

    #[error("no tokio runtime available for scheduler '{0}'")]
    NoRuntime(String),
}
