//! Nodes: named datasets with rich version histories.

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
pub struct Node {
    pub id: ItemId,
    pub name: String,
    pub tags: BTreeMap<String, Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeVersion {
    #[serde(flatten)]
    pub rich: RichVersion,
    pub node_id: ItemId,
}

/// Creates and retrieves nodes and their versions.
#[derive(Clone)]
pub struct NodeFactory {
    backend: Arc<dyn Backend>,
    ids: Arc<IdGenerator>,
    base: EntityBase,
    rich: RichVersionStore,
}

impl NodeFactory {
    pub(crate) fn new(backend: Arc<dyn Backend>, ids: Arc<IdGenerator>) -> Self {
        NodeFactory {
            backend,
            ids,
            base: EntityBase::new(collection::NODE, "node"),
            rich: RichVersionStore::default(),
        }
    }

    pub fn create(&self, name: &str, tags: &BTreeMap<String, Option<TagValue>>) -> LodeResult<Node> {
        let (id, tags) = with_connection(self.backend.as_ref(), |conn| {
            self.base.create_item(conn, &self.ids, name, tags)
        })?;
        info!(node = name, id = %id, "created node");
        Ok(Node {
            id,
            name: name.to_string(),
            tags,
        })
    }

    pub fn retrieve(&self, name: &str) -> LodeResult<Node> {
        let (id, tags) =
            with_connection(self.backend.as_ref(), |conn| self.base.retrieve_item(conn, name))?;
        info!(node = name, id = %id, "retrieved node");
        Ok(Node {
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

    /// Leaf frontier of the named node's version DAG.
    pub fn leaves(&self, name: &str) -> LodeResult<Vec<VersionId>> {
        with_connection(self.backend.as_ref(), |conn| {
            let (id, _) = self.base.retrieve_item(conn, name)?;
            self.base.engine.get_leaves(conn, id)
        })
    }

    pub fn create_version(
        &self,
        node_id: ItemId,
        args: &RichVersionArgs,
        parent_ids: &[VersionId],
    ) -> LodeResult<NodeVersion> {
        let id = self.ids.next_version_id();
        let rich = with_connection(self.backend.as_ref(), |conn| {
            self.base.engine.insert_version(conn, node_id, id, parent_ids)?;
            let rich = self.rich.insert(conn, id, args)?;
            conn.insert(
                collection::NODE_VERSION,
                RowBuilder::new()
                    .set(column::ID, id.to_string())
                    .set(column::NODE_ID, node_id.to_string())
                    .build(),
            )?;
            Ok(rich)
        })?;
        info!(node = %node_id, version = %id, "created node version");
        Ok(NodeVersion { rich, node_id })
    }

    pub fn retrieve_version(&self, id: VersionId) -> LodeResult<NodeVersion> {
        with_connection(self.backend.as_ref(), |conn| {
            let row = conn
                .get_vertex(
                    collection::NODE_VERSION,
                    &[Predicate::eq(column::ID, id.to_string())],
                )
                .map_err(|e| {
                    if e.is_not_found() {
                        LodeError::not_found(format!("node version {}", id))
                    } else {
                        e
                    }
                })?;
            let node_id = ItemId(require_u64(&row, column::NODE_ID)?);
            let rich = self.rich.retrieve(conn, id)?;
            Ok(NodeVersion { rich, node_id })
        })
    }
}
