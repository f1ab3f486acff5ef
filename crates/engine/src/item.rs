//! The versioned-item engine.
//!
//! Each item owns a DAG of versions. The engine inserts items and versions,
//! validates parent declarations, and maintains the leaf frontier
//! incrementally: a leaf row is added for a new childless version and
//! removed from each parent the moment it gains a child. The frontier is
//! never recomputed by a graph-wide scan, so the algorithm costs the same
//! on a column store as on a graph store.

use std::collections::BTreeMap;

use tracing::debug;

use lode_core::schema::{collection, column};
use lode_core::{ItemId, LodeError, LodeResult, Tag, VersionId};
use lode_store::{require_u64, Connection, Predicate, RowBuilder};

use crate::tag_index::{TagIndex, TagNamespace};

/// An item row plus its tags.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub tags: BTreeMap<String, Tag>,
}

/// DAG operations shared by every entity factory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemEngine {
    tags: TagIndex,
}

impl ItemEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist an item row and its tags.
    ///
    /// The id generator makes collisions impossible in normal operation, but
    /// not every backend enforces uniqueness, so the engine checks anyway.
    pub fn insert_item(
        &self,
        conn: &mut dyn Connection,
        id: ItemId,
        tags: &BTreeMap<String, Tag>,
    ) -> LodeResult<()> {
        let existing = conn.equality_select(
            collection::ITEM,
            &[column::ID],
            &[Predicate::eq(column::ID, id.to_string())],
        )?;
        if !existing.is_empty() {
            return Err(LodeError::duplicate_id(format!("item {}", id)));
        }

        conn.insert(
            collection::ITEM,
            RowBuilder::new().set(column::ID, id.to_string()).build(),
        )?;
        self.tags
            .put_tags(conn, TagNamespace::Item, id.as_u64(), tags)?;
        debug!(item = %id, tags = tags.len(), "inserted item");
        Ok(())
    }

    /// The item row and its tags; `NotFound` when absent.
    pub fn get_item(&self, conn: &mut dyn Connection, id: ItemId) -> LodeResult<ItemRecord> {
        let rows = conn.equality_select(
            collection::ITEM,
            &[column::ID],
            &[Predicate::eq(column::ID, id.to_string())],
        )?;
        if rows.is_empty() {
            return Err(LodeError::not_found(format!("item {}", id)));
        }
        let tags = self.tags.get_tags(conn, TagNamespace::Item, id.as_u64())?;
        Ok(ItemRecord { id, tags })
    }

    /// Persist a new version row and link it into the item's DAG.
    pub fn insert_version(
        &self,
        conn: &mut dyn Connection,
        item_id: ItemId,
        version_id: VersionId,
        parent_ids: &[VersionId],
    ) -> LodeResult<()> {
        let item = conn.equality_select(
            collection::ITEM,
            &[column::ID],
            &[Predicate::eq(column::ID, item_id.to_string())],
        )?;
        if item.is_empty() {
            return Err(LodeError::not_found(format!("item {}", item_id)));
        }

        let existing = conn.equality_select(
            collection::VERSION,
            &[column::ID],
            &[Predicate::eq(column::ID, version_id.to_string())],
        )?;
        if !existing.is_empty() {
            return Err(LodeError::duplicate_id(format!("version {}", version_id)));
        }

        conn.insert(
            collection::VERSION,
            RowBuilder::new()
                .set(column::ID, version_id.to_string())
                .set(column::ITEM_ID, item_id.to_string())
                .build(),
        )?;
        self.link_version(conn, item_id, version_id, parent_ids)
    }

    /// The parent-linking step, shared with factory `update` for versions
    /// that were persisted earlier.
    ///
    /// An empty `parent_ids` means "append to the current head(s)": the
    /// child is linked under every current leaf, so the history stays one
    /// DAG with a single evolving frontier rather than a forest. Explicit
    /// parents are deduplicated before linking.
    ///
    /// When re-linking an existing version, the named parents must not be
    /// descendants of the child; ancestry is not re-walked, so a caller who
    /// links a version under its own descendant corrupts the DAG.
    pub fn link_version(
        &self,
        conn: &mut dyn Connection,
        item_id: ItemId,
        child_id: VersionId,
        parent_ids: &[VersionId],
    ) -> LodeResult<()> {
        // the child may have been persisted by this transaction or an
        // earlier one, but it must exist and belong to this item
        let child = conn.equality_select(
            collection::VERSION,
            &[column::ITEM_ID],
            &[Predicate::eq(column::ID, child_id.to_string())],
        )?;
        match child.first() {
            None => return Err(LodeError::not_found(format!("version {}", child_id))),
            Some(row) if require_u64(row, column::ITEM_ID)? != item_id.as_u64() => {
                return Err(LodeError::invalid_parent(format!(
                    "version {} does not belong to item {}",
                    child_id, item_id
                )))
            }
            Some(_) => {}
        }

        let leaves = self.get_leaves(conn, item_id)?;

        let parents: Vec<VersionId> = if parent_ids.is_empty() {
            leaves.clone()
        } else {
            let mut parents = parent_ids.to_vec();
            parents.sort_unstable();
            parents.dedup();
            for &parent in &parents {
                self.check_parent(conn, item_id, child_id, parent)?;
            }
            parents
        };

        for &parent in &parents {
            conn.insert(
                collection::VERSION_PARENT,
                RowBuilder::new()
                    .set(column::CHILD_ID, child_id.to_string())
                    .set(column::PARENT_ID, parent.to_string())
                    .build(),
            )?;
            if leaves.contains(&parent) {
                conn.delete(
                    collection::ITEM_LEAF,
                    &[
                        Predicate::eq(column::ITEM_ID, item_id.to_string()),
                        Predicate::eq(column::VERSION_ID, parent.to_string()),
                    ],
                )?;
            }
        }

        let children = conn.equality_select(
            collection::VERSION_PARENT,
            &[column::CHILD_ID],
            &[Predicate::eq(column::PARENT_ID, child_id.to_string())],
        )?;
        if children.is_empty() {
            // the child may already hold a leaf row when update re-links a
            // current leaf under new parents
            let already_leaf = conn.equality_select(
                collection::ITEM_LEAF,
                &[column::VERSION_ID],
                &[
                    Predicate::eq(column::ITEM_ID, item_id.to_string()),
                    Predicate::eq(column::VERSION_ID, child_id.to_string()),
                ],
            )?;
            if already_leaf.is_empty() {
                conn.insert(
                    collection::ITEM_LEAF,
                    RowBuilder::new()
                        .set(column::ITEM_ID, item_id.to_string())
                        .set(column::VERSION_ID, child_id.to_string())
                        .build(),
                )?;
            }
        }

        debug!(
            item = %item_id,
            child = %child_id,
            parents = parents.len(),
            "linked version"
        );
        Ok(())
    }

    /// The current leaf frontier; empty for an item with no versions yet.
    pub fn get_leaves(
        &self,
        conn: &mut dyn Connection,
        item_id: ItemId,
    ) -> LodeResult<Vec<VersionId>> {
        let rows = conn.equality_select(
            collection::ITEM_LEAF,
            &[column::VERSION_ID],
            &[Predicate::eq(column::ITEM_ID, item_id.to_string())],
        )?;
        let mut leaves = Vec::with_capacity(rows.len());
        for row in &rows {
            leaves.push(VersionId(require_u64(row, column::VERSION_ID)?));
        }
        leaves.sort_unstable();
        Ok(leaves)
    }

    fn check_parent(
        &self,
        conn: &mut dyn Connection,
        item_id: ItemId,
        child_id: VersionId,
        parent: VersionId,
    ) -> LodeResult<()> {
        if parent == child_id {
            return Err(LodeError::invalid_parent(format!(
                "version {} cannot be its own parent",
                child_id
            )));
        }
        let rows = conn.equality_select(
            collection::VERSION,
            &[column::ITEM_ID],
            &[Predicate::eq(column::ID, parent.to_string())],
        )?;
        match rows.first() {
            None => Err(LodeError::invalid_parent(format!(
                "version {} does not exist",
                parent
            ))),
            Some(row) if require_u64(row, column::ITEM_ID)? != item_id.as_u64() => {
                Err(LodeError::invalid_parent(format!(
                    "version {} does not belong to item {}",
                    parent, item_id
                )))
            }
            Some(_) => Ok(()),
        }
    }
}
