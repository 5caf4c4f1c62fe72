//! PCH creator trait.
//!
//! Creators run the compiler that turns a header set into a precompiled
//! header. Each scheduler slot owns one creator.

use async_trait::async_trait;

use crate::{PchTask, ProjectPartPch, Result};

#[async_trait]
pub trait PchCreator: Send {
    /// Generate the PCH for a fully populated task. The result is read back
    /// through [`PchCreator::project_part_pch`].
    async fn generate_pch(&mut self, task: PchTask) -> Result<()>;

    /// Result of the last [`PchCreator::generate_pch`] call.
    fn project_part_pch(&self) -> &ProjectPartPch;
}
