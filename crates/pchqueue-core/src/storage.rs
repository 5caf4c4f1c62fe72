//! Precompiled header record storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::{PchRecord, ProjectPartId, Result};

/// Storage of the PCH records the rest of the backend reads, keyed by
/// project part id.
#[async_trait]
pub trait PrecompiledHeaderStorage: Send + Sync {
    /// Path of the system PCH a project part builds on, if one is stored.
    async fn fetch_system_precompiled_header_path(
        &self,
        id: ProjectPartId,
    ) -> Result<Option<PathBuf>>;

    /// The project PCH record of a project part.
    async fn fetch_precompiled_header(&self, id: ProjectPartId) -> Result<Option<PchRecord>>;

    /// Insert or replace the project PCH record of a project part.
    async fn insert_project_precompiled_header(
        &self,
        id: ProjectPartId,
        path: &Path,
        last_modified: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete the project PCH record of a project part.
    async fn delete_project_precompiled_header(&self, id: ProjectPartId) -> Result<()>;

    /// Insert or replace the system PCH record of every given project part.
    async fn insert_system_precompiled_headers(
        &self,
        ids: &[ProjectPartId],
        path: &Path,
        last_modified: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete the system PCH records of every given project part.
    async fn delete_system_precompiled_headers(&self, ids: &[ProjectPartId]) -> Result<()>;
}

/// In-memory implementation of PrecompiledHeaderStorage.
#[derive(Debug, Default)]
pub struct MemoryPchStorage {
    state: RwLock<StorageState>,
}

#[derive(Debug, Default)]
struct StorageState {
    project: BTreeMap<ProjectPartId, PchRecord>,
    system: BTreeMap<ProjectPartId, PchRecord>,
}

impl MemoryPchStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// All project records ordered by id.
    pub fn project_records(&self) -> Vec<(ProjectPartId, PchRecord)> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .project
            .iter()
            .map(|(id, record)| (*id, record.clone()))
            .collect()
    }

    /// All system records ordered by id.
    pub fn system_records(&self) -> Vec<(ProjectPartId, PchRecord)> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .system
            .iter()
            .map(|(id, record)| (*id, record.clone()))
            .collect()
    }
}

#[async_trait]
impl PrecompiledHeaderStorage for MemoryPchStorage {
    async fn fetch_system_precompiled_header_path(
        &self,
        id: ProjectPartId,
    ) -> Result<Option<PathBuf>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.system.get(&id).map(|record| record.path.clone()))
    }

    async fn fetch_precompiled_header(&self, id: ProjectPartId) -> Result<Option<PchRecord>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.project.get(&id).cloned())
    }

    async fn insert_project_precompiled_header(
        &self,
        id: ProjectPartId,
        path: &Path,
        last_modified: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.project.insert(
            id,
            PchRecord {
                path: path.to_path_buf(),
                last_modified,
            },
        );
        Ok(())
    }

    async fn delete_project_precompiled_header(&self, id: ProjectPartId) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.project.remove(&id);
        Ok(())
    }

    async fn insert_system_precompiled_headers(
        &self,
        ids: &[ProjectPartId],
        path: &Path,
        last_modified: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        for id in ids {
            state.system.insert(
                *id,
                PchRecord {
                    path: path.to_path_buf(),
                    last_modified,
                },
            );
        }
        Ok(())
    }

    async fn delete_system_precompiled_headers(&self, ids: &[ProjectPartId]) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        for id in ids {
            state.system.remove(id);
        }
        Ok(())
    }
}
