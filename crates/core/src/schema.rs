//! Abstract names of the persisted collections and their columns.
//!
//! Backends are free to realize a collection as a table, a vertex label, or
//! an edge label, but every layer addresses it by these names.

/// Collection (table / label) names.
pub mod collection {
    /// Item rows: `(id)`.
    pub const ITEM: &str = "item";
    /// Item-namespace tags: `(item_id, key, value, type)`.
    pub const ITEM_TAG: &str = "item_tag";
    /// Version rows: `(id, item_id)`.
    pub const VERSION: &str = "version";
    /// Version-namespace tags: `(version_id, key, value, type)`.
    pub const VERSION_TAG: &str = "version_tag";
    /// DAG parent edges: `(child_id, parent_id)`.
    pub const VERSION_PARENT: &str = "version_parent";
    /// Leaf frontier: `(item_id, version_id)`.
    pub const ITEM_LEAF: &str = "item_leaf";

    /// Rich-version rows: `(id, structure_version_id, reference)`.
    pub const RICH_VERSION: &str = "rich_version";
    /// External reference parameters: `(rich_version_id, key, value)`.
    pub const RICH_VERSION_PARAMETER: &str = "rich_version_external_parameter";

    /// Graph entities: `(item_id, name)`.
    pub const GRAPH: &str = "graph";
    /// Graph versions: `(id, graph_id)`.
    pub const GRAPH_VERSION: &str = "graph_version";
    /// Graph-version membership: `(graph_version_id, edge_version_id)`.
    pub const GRAPH_VERSION_EDGE: &str = "graph_version_edge";

    /// Node entities: `(item_id, name)`.
    pub const NODE: &str = "node";
    /// Node versions: `(id, node_id)`.
    pub const NODE_VERSION: &str = "node_version";

    /// Edge entities: `(item_id, name)`.
    pub const EDGE: &str = "edge";
    /// Edge versions: `(id, edge_id, from_node_version_id, to_node_version_id)`.
    pub const EDGE_VERSION: &str = "edge_version";

    /// Structure entities: `(item_id, name)`.
    pub const STRUCTURE: &str = "structure";
    /// Structure versions: `(id, structure_id)`.
    pub const STRUCTURE_VERSION: &str = "structure_version";
    /// Declared attributes: `(structure_version_id, key, type)`.
    pub const STRUCTURE_VERSION_ATTRIBUTE: &str = "structure_version_attribute";

    /// Lineage-edge entities: `(item_id, name)`.
    pub const LINEAGE_EDGE: &str = "lineage_edge";
    /// Lineage-edge versions:
    /// `(id, lineage_edge_id, from_rich_version_id, to_rich_version_id)`.
    pub const LINEAGE_EDGE_VERSION: &str = "lineage_edge_version";
}

/// Column (property) names.
pub mod column {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const KEY: &str = "key";
    pub const VALUE: &str = "value";
    pub const TYPE: &str = "type";

    pub const ITEM_ID: &str = "item_id";
    pub const VERSION_ID: &str = "version_id";
    pub const CHILD_ID: &str = "child_id";
    pub const PARENT_ID: &str = "parent_id";

    pub const STRUCTURE_VERSION_ID: &str = "structure_version_id";
    pub const REFERENCE: &str = "reference";
    pub const RICH_VERSION_ID: &str = "rich_version_id";

    pub const GRAPH_ID: &str = "graph_id";
    pub const GRAPH_VERSION_ID: &str = "graph_version_id";
    pub const EDGE_VERSION_ID: &str = "edge_version_id";
    pub const NODE_ID: &str = "node_id";
    pub const EDGE_ID: &str = "edge_id";
    pub const FROM_NODE_VERSION_ID: &str = "from_node_version_id";
    pub const TO_NODE_VERSION_ID: &str = "to_node_version_id";
    pub const STRUCTURE_ID: &str = "structure_id";
    pub const LINEAGE_EDGE_ID: &str = "lineage_edge_id";
    pub const FROM_RICH_VERSION_ID: &str = "from_rich_version_id";
    pub const TO_RICH_VERSION_ID: &str = "to_rich_version_id";
}
