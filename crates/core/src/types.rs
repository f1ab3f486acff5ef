//! Identifier newtypes for items and versions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a tracked item (graph, node, edge, structure, lineage edge).
///
/// Assigned once at creation from the item sequence of [`crate::IdGenerator`]
/// and immutable afterwards.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ItemId(pub u64);

/// Identifier of an immutable version in an item's history DAG.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct VersionId(pub u64);

impl ItemId {
    /// Raw numeric form, used as a tag-owner id and as a persisted literal.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl VersionId {
    /// Raw numeric form, used as a tag-owner id and as a persisted literal.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ItemId {
    fn from(raw: u64) -> Self {
        ItemId(raw)
    }
}

impl From<u64> for VersionId {
    fn from(raw: u64) -> Self {
        VersionId(raw)
    }
}
