//! PCH task scheduling.
//!
//! Keeps pending system and project PCH tasks in ordered collections and
//! dispatches them onto slot-limited schedulers. System work always goes
//! first; project work is only admitted while no system PCH is being built.

pub mod collection;
pub mod error;
pub mod queue;
pub mod scheduler;
pub mod worker;

pub use collection::PchTaskCollection;
pub use error::SchedulerError;
pub use queue::{PchTaskQueue, QueueStats, TickOutcome};
pub use scheduler::{SlotScheduler, SlotUsage, Task, TaskScheduler, task};
pub use worker::QueueWorker;
