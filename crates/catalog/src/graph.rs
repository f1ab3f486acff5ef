//! Graphs: named, versioned collections of edge versions.

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
pub struct Graph {
    pub id: ItemId,
    pub name: String,
    pub tags: BTreeMap<String, Tag>,
}

/// One revision of a graph: a rich version plus its member edge versions,
/// kept in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphVersion {
    #[serde(flatten)]
    pub rich: RichVersion,
    pub graph_id: ItemId,
    pub edge_version_ids: Vec<VersionId>,
}

/// Creates and retrieves graphs and their versions.
#[derive(Clone)]
pub struct GraphFactory {
    backend: Arc<dyn Backend>,
    ids: Arc<IdGenerator>,
    base: EntityBase,
    rich: RichVersionStore,
}

impl GraphFactory {
    pub(crate) fn new(backend: Arc<dyn Backend>, ids: Arc<IdGenerator>) -> Self {
        GraphFactory {
            backend,
            ids,
            base: EntityBase::new(collection::GRAPH, "graph"),
            rich: RichVersionStore::default(),
        }
    }

    pub fn create(&self, name: &str, tags: &BTreeMap<String, Option<TagValue>>) -> LodeResult<Graph> {
        let (id, tags) = with_connection(self.backend.as_ref(), |conn| {
            self.base.create_item(conn, &self.ids, name, tags)
        })?;
        info!(graph = name, id = %id, "created graph");
        Ok(Graph {
            id,
            name: name.to_string(),
            tags,
        })
    }

    pub fn retrieve(&self, name: &str) -> LodeResult<Graph> {
        let (id, tags) =
            with_connection(self.backend.as_ref(), |conn| self.base.retrieve_item(conn, name))?;
        info!(graph = name, id = %id, "retrieved graph");
        Ok(Graph {
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

    /// Leaf frontier of the named graph's version DAG.
    pub fn leaves(&self, name: &str) -> LodeResult<Vec<VersionId>> {
        with_connection(self.backend.as_ref(), |conn| {
            let (id, _) = self.base.retrieve_item(conn, name)?;
            self.base.engine.get_leaves(conn, id)
        })
    }

    pub fn create_version(
        &self,
        graph_id: ItemId,
        edge_version_ids: &[VersionId],
        args: &RichVersionArgs,
        parent_ids: &[VersionId],
    ) -> LodeResult<GraphVersion> {
        let id = self.ids.next_version_id();
        let rich = with_connection(self.backend.as_ref(), |conn| {
            self.base.engine.insert_version(conn, graph_id, id, parent_ids)?;
            let rich = self.rich.insert(conn, id, args)?;
            conn.insert(
                collection::GRAPH_VERSION,
                RowBuilder::new()
                    .set(column::ID, id.to_string())
                    .set(column::GRAPH_ID, graph_id.to_string())
                    .build(),
            )?;
            for &edge_version in edge_version_ids {
                // membership must reference persisted edge versions on every
                // backend, not only the ones that resolve edges at commit
                let present = conn.equality_select(
                    collection::EDGE_VERSION,
                    &[column::ID],
                    &[Predicate::eq(column::ID, edge_version.to_string())],
                )?;
                if present.is_empty() {
                    return Err(LodeError::not_found(format!(
                        "edge version {}",
                        edge_version
                    )));
                }
                conn.insert(
                    collection::GRAPH_VERSION_EDGE,
                    RowBuilder::new()
                        .set(column::GRAPH_VERSION_ID, id.to_string())
                        .set(column::EDGE_VERSION_ID, edge_version.to_string())
                        .build(),
                )?;
            }
            Ok(rich)
        })?;
        info!(
            graph = %graph_id,
            version = %id,
            members = edge_version_ids.len(),
            "created graph version"
        );
        Ok(GraphVersion {
            rich,
            graph_id,
            edge_version_ids: edge_version_ids.to_vec(),
        })
    }

    pub fn retrieve_version(&self, id: VersionId) -> LodeResult<GraphVersion> {
        with_connection(self.backend.as_ref(), |conn| {
            let row = conn
                .get_vertex(
                    collection::GRAPH_VERSION,
                    &[Predicate::eq(column::ID, id.to_string())],
                )
                .map_err(|e| {
                    if e.is_not_found() {
                        LodeError::not_found(format!("graph version {}", id))
                    } else {
                        e
                    }
                })?;
            let graph_id = ItemId(require_u64(&row, column::GRAPH_ID)?);

            // membership comes back in insertion order on every backend
            let rows = conn.equality_select(
                collection::GRAPH_VERSION_EDGE,
                &[column::EDGE_VERSION_ID],
                &[Predicate::eq(column::GRAPH_VERSION_ID, id.to_string())],
            )?;
            let mut edge_version_ids = Vec::with_capacity(rows.len());
            for row in &rows {
                edge_version_ids.push(VersionId(require_u64(row, column::EDGE_VERSION_ID)?));
            }

            let rich = self.rich.retrieve(conn, id)?;
            Ok(GraphVersion {
                rich,
                graph_id,
                edge_version_ids,
            })
        })
    }
}
