//! Lineage edges: versioned provenance links between any two rich versions.
//!
//! Unlike plain edges, lineage edges connect versions of different entity
//! kinds, so the endpoints are rich-version ids rather than node versions.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use lode_core::schema::{collection, column};
use lode_core::{IdGenerator, ItemId, LodeError, LodeResult, Tag, TagValue, VersionId};
use lode_store::{require_u64, Backend, Predicate, RowBuilder};

use crate::base::EntityBase;
use crate::rich::{RichVersion, RichVersionArgs, RichVersionStore};
use crate::txn::with_connection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageEdge {
    pub id: ItemId,
    pub name: String,
    pub tags: BTreeMap<String, Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageEdgeVersion {
    #[serde(flatten)]
    pub rich: RichVersion,
    pub lineage_edge_id: ItemId,
    pub from_rich_version_id: VersionId,
    pub to_rich_version_id: VersionId,
}

/// Creates and retrieves lineage edges and their versions.
#[derive(Clone)]
pub struct LineageEdgeFactory {
    backend: Arc<dyn Backend>,
    ids: Arc<IdGenerator>,
    base: EntityBase,
    rich: RichVersionStore,
}

impl LineageEdgeFactory {
    pub(crate) fn new(backend: Arc<dyn Backend>, ids: Arc<IdGenerator>) -> Self {
        LineageEdgeFactory {
            backend,
            ids,
            base: EntityBase::new(collection::LINEAGE_EDGE, "lineage edge"),
            rich: RichVersionStore::default(),
        }
    }

    pub fn create(
        &self,
        name: &str,
        tags: &BTreeMap<String, Option<TagValue>>,
    ) -> LodeResult<LineageEdge> {
        let (id, tags) = with_connection(self.backend.as_ref(), |conn| {
            self.base.create_item(conn, &self.ids, name, tags)
        })?;
        info!(lineage_edge = name, id = %id, "created lineage edge");
        Ok(LineageEdge {
            id,
            name: name.to_string(),
            tags,
        })
    }

    pub fn retrieve(&self, name: &str) -> LodeResult<LineageEdge> {
        let (id, tags) =
            with_connection(self.backend.as_ref(), |conn| self.base.retrieve_item(conn, name))?;
        info!(lineage_edge = name, id = %id, "retrieved lineage edge");
        Ok(LineageEdge {
            id,
            name: name.to_string(),
            tags,
        })
    }

    /// Link an already persisted version under new parents.
    ///
    /// Parents must not be descendants of the child; ancestry is not
    /// re-walked.
    pub fn update(
        &self,
        item_id: ItemId,
        child_id: VersionId,
        parent_ids: &[VersionId],
    ) -> LodeResult<()> {
        with_connection(self.backend.as_ref(), |conn| {
            self.base.engine.link_version(conn, item_id, child_id, parent_ids)
        })
    }

    /// Leaf frontier of the named lineage edge's version DAG.
    pub fn leaves(&self, name: &str) -> LodeResult<Vec<VersionId>> {
        with_connection(self.backend.as_ref(), |conn| {
            let (id, _) = self.base.retrieve_item(conn, name)?;
            self.base.engine.get_leaves(conn, id)
        })
    }

    pub fn create_version(
        &self,
        lineage_edge_id: ItemId,
        from_rich_version_id: VersionId,
        to_rich_version_id: VersionId,
        args: &RichVersionArgs,
        parent_ids: &[VersionId],
    ) -> LodeResult<LineageEdgeVersion> {
        let id = self.ids.next_version_id();
        let rich = with_connection(self.backend.as_ref(), |conn| {
            // both endpoints must be persisted versions on every backend
            for endpoint in [from_rich_version_id, to_rich_version_id] {
                let present = conn.equality_select(
                    collection::VERSION,
                    &[column::ID],
                    &[Predicate::eq(column::ID, endpoint.to_string())],
                )?;
                if present.is_empty() {
                    return Err(LodeError::not_found(format!("version {}", endpoint)));
                }
            }
            self.base
                .engine
                .insert_version(conn, lineage_edge_id, id, parent_ids)?;
            let rich = self.rich.insert(conn, id, args)?;
            conn.insert(
                collection::LINEAGE_EDGE_VERSION,
                RowBuilder::new()
                    .set(column::ID, id.to_string())
                    .set(column::LINEAGE_EDGE_ID, lineage_edge_id.to_string())
                    .set(column::FROM_RICH_VERSION_ID, from_rich_version_id.to_string())
                    .set(column::TO_RICH_VERSION_ID, to_rich_version_id.to_string())
                    .build(),
            )?;
            Ok(rich)
        })?;
        info!(lineage_edge = %lineage_edge_id, version = %id, "created lineage edge version");
        Ok(LineageEdgeVersion {
            rich,
            lineage_edge_id,
            from_rich_version_id,
            to_rich_version_id,
        })
    }

    pub fn retrieve_version(&self, id: VersionId) -> LodeResult<LineageEdgeVersion> {
        with_connection(self.backend.as_ref(), |conn| {
            let row = conn
                .get_vertex(
                    collection::LINEAGE_EDGE_VERSION,
                    &[Predicate::eq(column::ID, id.to_string())],
                )
                .map_err(|e| {
                    if e.is_not_found() {
                        LodeError::not_found(format!("lineage edge version {}", id))
                    } else {
                        e
                    }
                })?;
            let lineage_edge_id = ItemId(require_u64(&row, column::LINEAGE_EDGE_ID)?);
            let from_rich_version_id =
                VersionId(require_u64(&row, column::FROM_RICH_VERSION_ID)?);
            let to_rich_version_id = VersionId(require_u64(&row, column::TO_RICH_VERSION_ID)?);
            let rich = self.rich.retrieve(conn, id)?;
            Ok(LineageEdgeVersion {
                rich,
                lineage_edge_id,
                from_rich_version_id,
                to_rich_version_id,
            })
        })
    }
}
