//! KDL configuration parsing for the PCH task queue.
//!
//! This crate handles parsing of:
//! - Scheduler slot counts and tick interval
//! - Environment settings handed to PCH tasks
//! - Output location of generated PCHs

pub mod error;
pub mod queue;

pub use error::{ConfigError, ConfigResult};
pub use queue::{QueueConfig, load_queue_config, parse_queue_config};
