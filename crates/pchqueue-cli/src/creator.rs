//! Dry-run PCH creator.

use async_trait::async_trait;
use chrono::Utc;
use pchqueue_core::{PchCreator, PchTask, ProjectPartPch, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Creator that reports where a PCH would be written without running a
/// compiler.
pub struct DryRunCreator {
    output_dir: PathBuf,
    pch: ProjectPartPch,
}

impl DryRunCreator {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            pch: ProjectPartPch::default(),
        }
    }

    /// File name derived from the task key, e.g. `pch-1-2.pch`.
    pub fn pch_path(output_dir: &Path, task: &PchTask) -> PathBuf {
        let key = task
            .key()
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("-");
        output_dir.join(format!("pch-{}.pch", key))
    }
}

#[async_trait]
impl PchCreator for DryRunCreator {
    async fn generate_pch(&mut self, task: PchTask) -> Result<()> {
        let path = Self::pch_path(&self.output_dir, &task);
        info!(
            project_parts = ?task.key(),
            includes = task.includes.len(),
            sources = task.sources.len(),
            macros = task.compiler_macros.len(),
            language = ?task.language,
            system_pch = ?task.system_pch_path,
            path = %path.display(),
            "Would generate PCH"
        );

        self.pch = ProjectPartPch::new(task.project_part_id().unwrap_or_default(), path, Utc::now());
        Ok(())
    }

    fn project_part_pch(&self) -> &ProjectPartPch {
        &self.pch
    }
}
