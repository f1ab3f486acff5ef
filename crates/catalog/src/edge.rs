//! Edges: named, versioned connections between two nodes' version histories.

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
pub struct Edge {
    pub id: ItemId,
    pub name: String,
    pub tags: BTreeMap<String, Tag>,
}

/// One revision of an edge, pinned to a version of each endpoint node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeVersion {
    #[serde(flatten)]
    pub rich: RichVersion,
    pub edge_id: ItemId,
    pub from_node_version_id: VersionId,
    pub to_node_version_id: VersionId,
}

/// Creates and retrieves edges and their versions.
#[derive(Clone)]
pub struct EdgeFactory {
    backend: Arc<dyn Backend>,
    ids: Arc<IdGenerator>,
    base: EntityBase,
    rich: RichVersionStore,
}

impl EdgeFactory {
    pub(crate) fn new(backend: Arc<dyn Backend>, ids: Arc<IdGenerator>) -> Self {
        EdgeFactory {
            backend,
            ids,
            base: EntityBase::new(collection::EDGE, "edge"),
            rich: RichVersionStore::default(),
        }
    }

    pub fn create(&self, name: &str, tags: &BTreeMap<String, Option<TagValue>>) -> LodeResult<Edge> {
        let (id, tags) = with_connection(self.backend.as_ref(), |conn| {
            self.base.create_item(conn, &self.ids, name, tags)
        })?;
        info!(edge = name, id = %id, "created edge");
        Ok(Edge {
            id,
            name: name.to_string(),
            tags,
        })
    }

    pub fn retrieve(&self, name: &str) -> LodeResult<Edge> {
        let (id, tags) =
            with_connection(self.backend.as_ref(), |conn| self.base.retrieve_item(conn, name))?;
        info!(edge = name, id = %id, "retrieved edge");
        Ok(Edge {
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

    /// Leaf frontier of the named edge's version DAG.
    pub fn leaves(&self, name: &str) -> LodeResult<Vec<VersionId>> {
        with_connection(self.backend.as_ref(), |conn| {
            let (id, _) = self.base.retrieve_item(conn, name)?;
            self.base.engine.get_leaves(conn, id)
        })
    }

    pub fn create_version(
        &self,
        edge_id: ItemId,
        from_node_version_id: VersionId,
        to_node_version_id: VersionId,
        args: &RichVersionArgs,
        parent_ids: &[VersionId],
    ) -> LodeResult<EdgeVersion> {
        let id = self.ids.next_version_id();
        let rich = with_connection(self.backend.as_ref(), |conn| {
            self.base.engine.insert_version(conn, edge_id, id, parent_ids)?;
            let rich = self.rich.insert(conn, id, args)?;
            conn.insert(
                collection::EDGE_VERSION,
                RowBuilder::new()
                    .set(column::ID, id.to_string())
                    .set(column::EDGE_ID, edge_id.to_string())
                    .set(column::FROM_NODE_VERSION_ID, from_node_version_id.to_string())
                    .set(column::TO_NODE_VERSION_ID, to_node_version_id.to_string())
                    .build(),
            )?;
            Ok(rich)
        })?;
        info!(edge = %edge_id, version = %id, "created edge version");
        Ok(EdgeVersion {
            rich,
            edge_id,
            from_node_version_id,
            to_node_version_id,
        })
    }

    pub fn retrieve_version(&self, id: VersionId) -> LodeResult<EdgeVersion> {
        with_connection(self.backend.as_ref(), |conn| {
            let row = conn
                .get_vertex(
                    collection::EDGE_VERSION,
                    &[Predicate::eq(column::ID, id.to_string())],
                )
                .map_err(|e| {
                    if e.is_not_found() {
                        LodeError::not_found(format!("edge version {}", id))
                    } else {
                        e
                    }
                })?;
            let edge_id = ItemId(require_u64(&row, column::EDGE_ID)?);
            let from_node_version_id =
                VersionId(require_u64(&row, column::FROM_NODE_VERSION_ID)?);
            let to_node_version_id = VersionId(require_u64(&row, column::TO_NODE_VERSION_ID)?);
            let rich = self.rich.retrieve(conn, id)?;
            Ok(EdgeVersion {
                rich,
                edge_id,
                from_node_version_id,
                to_node_version_id,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lode_store::ColumnStore;

    use crate::node::NodeFactory;

    fn factories() -> (EdgeFactory, NodeFactory) {
        let backend: Arc<dyn Backend> = Arc::new(ColumnStore::new());
        let ids = Arc::new(IdGenerator::new());
        (
            EdgeFactory::new(backend.clone(), ids.clone()),
            NodeFactory::new(backend, ids),
        )
    }

    #[test]
    fn version_pins_both_endpoints() {
        let (edges, nodes) = factories();
        let src = nodes.create("users", &BTreeMap::new()).unwrap();
        let dst = nodes.create("orders", &BTreeMap::new()).unwrap();
        let src_v = nodes
            .create_version(src.id, &RichVersionArgs::default(), &[])
            .unwrap();
        let dst_v = nodes
            .create_version(dst.id, &RichVersionArgs::default(), &[])
            .unwrap();

        let edge = edges.create("placed", &BTreeMap::new()).unwrap();
        let version = edges
            .create_version(
                edge.id,
                src_v.rich.id,
                dst_v.rich.id,
                &RichVersionArgs::default(),
                &[],
            )
            .unwrap();

        let read = edges.retrieve_version(version.rich.id).unwrap();
        assert_eq!(read, version);
        assert_eq!(read.from_node_version_id, src_v.rich.id);
        assert_eq!(read.to_node_version_id, dst_v.rich.id);
    }

    #[test]
    fn missing_version_is_not_found() {
        let (edges, _) = factories();
        let err = edges.retrieve_version(VersionId(404)).unwrap_err();
        assert!(err.is_not_found());
    }
}
