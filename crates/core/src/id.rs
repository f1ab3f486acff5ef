//! ID-generation service.
//!
//! One global sequence per entity category (items, versions), each backed by
//! an atomic counter so concurrent creators never collide. Injected into
//! factories as a shared service, never reached through global state.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{ItemId, VersionId};

/// Monotonic id source for items and versions.
#[derive(Debug, Default)]
pub struct IdGenerator {
    items: AtomicU64,
    versions: AtomicU64,
}

impl IdGenerator {
    /// Create a generator with both sequences at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from previously issued ids (e.g. after reloading a backend).
    pub fn starting_from(last_item: u64, last_version: u64) -> Self {
        IdGenerator {
            items: AtomicU64::new(last_item),
            versions: AtomicU64::new(last_version),
        }
    }

    /// Next unique item id.
    pub fn next_item_id(&self) -> ItemId {
        ItemId(self.items.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Next unique version id.
    pub fn next_version_id(&self) -> VersionId {
        VersionId(self.versions.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
