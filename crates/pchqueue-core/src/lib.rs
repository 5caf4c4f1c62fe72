//! Core domain types and traits for the precompiled header task queue.
//!
//! This crate contains:
//! - Project part identifiers
//! - PCH task and result types
//! - Collaborator traits (creator, storage, environment, progress)
//! - In-memory reference implementations of those collaborators

pub mod creator;
pub mod environment;
pub mod error;
pub mod id;
pub mod pch;
pub mod progress;
pub mod storage;
pub mod task;

pub use creator::PchCreator;
pub use environment::{Environment, StaticEnvironment};
pub use error::{Error, Result};
pub use id::{ProjectPartId, ProjectPartIds, is_normalized, normalize_ids};
pub use pch::{PchRecord, ProjectPartPch};
pub use progress::{ProgressCounter, SharedProgressCounter};
pub use storage::{MemoryPchStorage, PrecompiledHeaderStorage};
pub use task::{CompilerMacro, IncludeSearchPath, IncludeSearchPathKind, Language, PchTask, PchTasks};
