//! Lode: a versioned metadata catalog.
//!
//! Entities (graphs, nodes, edges, structures, lineage edges) own immutable
//! DAGs of versions, annotated with typed tags and realized identically over
//! three interchangeable storage engines. This crate re-exports the public
//! surface of the workspace members; start with [`Catalog`].

pub use lode_catalog::{
    BackendKind, Catalog, CatalogConfig, Credentials, Edge, EdgeFactory, EdgeVersion, Graph,
    GraphFactory, GraphVersion, LineageEdge, LineageEdgeFactory, LineageEdgeVersion, Node,
    NodeFactory, NodeVersion, RichVersion, RichVersionArgs, Structure, StructureFactory,
    StructureVersion,
};
pub use lode_core::schema;
pub use lode_core::{
    IdGenerator, ItemId, LodeError, LodeResult, Tag, TagValue, TagValueType, VersionId,
};
pub use lode_engine::{ItemEngine, ItemRecord, TagIndex, TagNamespace};
pub use lode_store::{
    Backend, ColumnStore, Connection, Predicate, PropertyGraphStore, Row, RowBuilder,
    TraversalGraphStore,
};
