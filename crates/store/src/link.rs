//! Static edge schema for the graph backends.
//!
//! The model's link collections are realized as native edges on the
//! property-graph and traversal-graph engines. Each spec names the vertex
//! collection on either side and the row column holding that endpoint's key,
//! so an abstract row like `version_parent(child_id, parent_id)` becomes an
//! edge between the two `version` vertices.

use lode_core::schema::{collection, column};

/// One side of a native edge: which vertex collection, matched on which key
/// column, referenced by which column of the edge row.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Endpoint {
    pub collection: &'static str,
    pub key_column: &'static str,
    pub ref_column: &'static str,
}

/// A link collection realized as a native edge label.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EdgeSpec {
    pub collection: &'static str,
    pub src: Endpoint,
    pub dst: Endpoint,
}

const EDGE_SPECS: &[EdgeSpec] = &[
    // child version -> parent version
    EdgeSpec {
        collection: collection::VERSION_PARENT,
        src: Endpoint {
            collection: collection::VERSION,
            key_column: column::ID,
            ref_column: column::CHILD_ID,
        },
        dst: Endpoint {
            collection: collection::VERSION,
            key_column: column::ID,
            ref_column: column::PARENT_ID,
        },
    },
    // item -> current leaf version
    EdgeSpec {
        collection: collection::ITEM_LEAF,
        src: Endpoint {
            collection: collection::ITEM,
            key_column: column::ID,
            ref_column: column::ITEM_ID,
        },
        dst: Endpoint {
            collection: collection::VERSION,
            key_column: column::ID,
            ref_column: column::VERSION_ID,
        },
    },
    // graph version -> member edge version
    EdgeSpec {
        collection: collection::GRAPH_VERSION_EDGE,
        src: Endpoint {
            collection: collection::GRAPH_VERSION,
            key_column: column::ID,
            ref_column: column::GRAPH_VERSION_ID,
        },
        dst: Endpoint {
            collection: collection::EDGE_VERSION,
            key_column: column::ID,
            ref_column: column::EDGE_VERSION_ID,
        },
    },
    // lineage edge version connects two rich versions
    EdgeSpec {
        collection: collection::LINEAGE_EDGE_VERSION,
        src: Endpoint {
            collection: collection::VERSION,
            key_column: column::ID,
            ref_column: column::FROM_RICH_VERSION_ID,
        },
        dst: Endpoint {
            collection: collection::VERSION,
            key_column: column::ID,
            ref_column: column::TO_RICH_VERSION_ID,
        },
    },
];

/// Look up the edge realization of a collection, if it has one.
pub(crate) fn edge_spec(collection: &str) -> Option<&'static EdgeSpec> {
    EDGE_SPECS.iter().find(|spec| spec.collection == collection)
}
