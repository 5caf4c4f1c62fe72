//! Produced PCH artifacts and stored records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::id::ProjectPartId;

/// What a creator produced for the last task it ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPartPch {
    pub project_part_id: ProjectPartId,
    /// `None` when nothing was produced, which means the stored PCH must go.
    pub pch_path: Option<PathBuf>,
    pub last_modified: DateTime<Utc>,
}

impl ProjectPartPch {
    pub fn new(project_part_id: ProjectPartId, pch_path: PathBuf, last_modified: DateTime<Utc>) -> Self {
        Self {
            project_part_id,
            pch_path: Some(pch_path),
            last_modified,
        }
    }

    /// A result without an artifact.
    pub fn empty(project_part_id: ProjectPartId) -> Self {
        Self {
            project_part_id,
            pch_path: None,
            last_modified: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl Default for ProjectPartPch {
    fn default() -> Self {
        Self::empty(ProjectPartId::default())
    }
}

/// A stored precompiled header entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PchRecord {
    pub path: PathBuf,
    pub last_modified: DateTime<Utc>,
}
