//! Project part identifiers.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Identifies one project part, the unit of project configuration a PCH is
/// built for. Ordering and equality follow the underlying number.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    From,
)]
#[display("{_0}")]
#[serde(transparent)]
pub struct ProjectPartId(i32);

impl ProjectPartId {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Get the underlying number.
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl From<ProjectPartId> for i32 {
    fn from(id: ProjectPartId) -> Self {
        id.0
    }
}

impl std::str::FromStr for ProjectPartId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// A list of project part ids. Removal and merge operations expect it sorted
/// ascending without duplicates.
pub type ProjectPartIds = Vec<ProjectPartId>;

/// Sort and dedup a list of ids in place.
pub fn normalize_ids(ids: &mut ProjectPartIds) {
    ids.sort_unstable();
    ids.dedup();
}

/// Whether `ids` is strictly ascending, i.e. sorted and duplicate-free.
pub fn is_normalized(ids: &[ProjectPartId]) -> bool {
    ids.windows(2).all(|pair| pair[0] < pair[1])
}
