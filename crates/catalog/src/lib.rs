//! The catalog layer: rich versions, entity factories, configuration, and
//! the [`Catalog`] facade bundling one backend with all of them.

mod base;
pub mod config;
pub mod edge;
pub mod graph;
pub mod lineage;
pub mod node;
pub mod rich;
pub mod structure;
mod txn;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use lode_core::{IdGenerator, ItemId, LodeResult, Tag, VersionId};
use lode_engine::{TagIndex, TagNamespace};
use lode_store::{Backend, ColumnStore, PropertyGraphStore, TraversalGraphStore};

pub use config::{BackendKind, CatalogConfig, Credentials};
pub use edge::{Edge, EdgeFactory, EdgeVersion};
pub use graph::{Graph, GraphFactory, GraphVersion};
pub use lineage::{LineageEdge, LineageEdgeFactory, LineageEdgeVersion};
pub use node::{Node, NodeFactory, NodeVersion};
pub use rich::{RichVersion, RichVersionArgs};
pub use structure::{Structure, StructureFactory, StructureVersion};

use crate::txn::with_connection;

/// One backend plus every factory, sharing a single id generator.
#[derive(Clone)]
pub struct Catalog {
    backend: Arc<dyn Backend>,
    tags: TagIndex,
    graphs: GraphFactory,
    nodes: NodeFactory,
    edges: EdgeFactory,
    structures: StructureFactory,
    lineage_edges: LineageEdgeFactory,
}

impl Catalog {
    /// Open a catalog on the configured backend.
    pub fn open(config: &CatalogConfig) -> LodeResult<Self> {
        let backend: Arc<dyn Backend> = match config.backend {
            BackendKind::Column => Arc::new(ColumnStore::new()),
            BackendKind::PropertyGraph => Arc::new(PropertyGraphStore::new()),
            BackendKind::TraversalGraph => Arc::new(TraversalGraphStore::new()),
        };
        info!(backend = backend.name(), "opened catalog");
        Ok(Self::with_backend(backend))
    }

    /// Build a catalog over an existing backend instance.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        let ids = Arc::new(IdGenerator::new());
        Catalog {
            tags: TagIndex,
            graphs: GraphFactory::new(backend.clone(), ids.clone()),
            nodes: NodeFactory::new(backend.clone(), ids.clone()),
            edges: EdgeFactory::new(backend.clone(), ids.clone()),
            structures: StructureFactory::new(backend.clone(), ids.clone()),
            lineage_edges: LineageEdgeFactory::new(backend.clone(), ids),
            backend,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn graphs(&self) -> &GraphFactory {
        &self.graphs
    }

    pub fn nodes(&self) -> &NodeFactory {
        &self.nodes
    }

    pub fn edges(&self) -> &EdgeFactory {
        &self.edges
    }

    pub fn structures(&self) -> &StructureFactory {
        &self.structures
    }

    pub fn lineage_edges(&self) -> &LineageEdgeFactory {
        &self.lineage_edges
    }

    /// Item ids carrying the given tag key, across every entity kind.
    pub fn item_ids_by_tag_key(&self, key: &str) -> LodeResult<Vec<ItemId>> {
        let owners = with_connection(self.backend.as_ref(), |conn| {
            self.tags.find_owners_by_tag_key(conn, TagNamespace::Item, key)
        })?;
        Ok(owners.into_iter().map(ItemId).collect())
    }

    /// Version ids carrying the given tag key.
    pub fn version_ids_by_tag_key(&self, key: &str) -> LodeResult<Vec<VersionId>> {
        let owners = with_connection(self.backend.as_ref(), |conn| {
            self.tags
                .find_owners_by_tag_key(conn, TagNamespace::Version, key)
        })?;
        Ok(owners.into_iter().map(VersionId).collect())
    }

    pub fn item_tags(&self, id: ItemId) -> LodeResult<BTreeMap<String, Tag>> {
        with_connection(self.backend.as_ref(), |conn| {
            self.tags.get_tags(conn, TagNamespace::Item, id.as_u64())
        })
    }

    pub fn version_tags(&self, id: VersionId) -> LodeResult<BTreeMap<String, Tag>> {
        with_connection(self.backend.as_ref(), |conn| {
            self.tags.get_tags(conn, TagNamespace::Version, id.as_u64())
        })
    }
}
