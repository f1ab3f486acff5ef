//! Traversal-graph storage engine.
//!
//! Tinkerpop-flavored: vertices carry their own adjacency lists and queries
//! are answered by walking them. A select over a link collection anchors on
//! whichever endpoint a predicate names, resolves that vertex through the
//! label index, then walks its out (or in) edges filtering by edge label and
//! properties. There is no global edge-label index; unanchored edge selects
//! traverse from every source-label vertex.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use lode_core::{LodeError, LodeResult};

use crate::link::{edge_spec, EdgeSpec};
use crate::{
    cell, ensure_open, matches, overlay, project, Backend, Connection, Op, Predicate, Row,
};

#[derive(Debug, Clone)]
struct TraversalVertex {
    properties: Row,
    out: Vec<u64>,
    inn: Vec<u64>,
}

#[derive(Debug, Clone)]
struct TraversalEdge {
    label: String,
    src: u64,
    dst: u64,
    properties: Row,
}

#[derive(Debug, Default)]
struct TraversalGraph {
    vertices: FxHashMap<u64, TraversalVertex>,
    edges: FxHashMap<u64, TraversalEdge>,
    /// Vertex label -> vertex ids (insertion order, may hold removed ids).
    labels: FxHashMap<String, Vec<u64>>,
    next_id: u64,
}

enum Undo {
    VertexAdded(u64),
    EdgeAdded(u64),
    VertexRemoved(u64, String, TraversalVertex),
    EdgeRemoved(u64, TraversalEdge),
}

impl TraversalGraph {
    fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// `g.V().hasLabel(label)`: live vertices under a label.
    fn vertices_with_label<'g>(
        &'g self,
        label: &str,
    ) -> impl Iterator<Item = (u64, &'g TraversalVertex)> + 'g {
        self.labels
            .get(label)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.vertices.get(&id).map(|v| (id, v)))
    }

    fn find_vertex(&self, label: &str, key_column: &str, key: &str) -> Option<u64> {
        self.vertices_with_label(label)
            .find(|(_, v)| cell(&v.properties, key_column) == Some(key))
            .map(|(id, _)| id)
    }

    fn select_vertices(&self, label: &str, predicates: &[Predicate]) -> Vec<Row> {
        self.vertices_with_label(label)
            .filter(|(_, v)| matches(&v.properties, predicates))
            .map(|(_, v)| v.properties.clone())
            .collect()
    }

    /// Walk one vertex's adjacency, filtering by edge label and properties.
    fn walk(&self, edge_ids: &[u64], label: &str, predicates: &[Predicate]) -> Vec<Row> {
        edge_ids
            .iter()
            .filter_map(|id| self.edges.get(id))
            .filter(|e| e.label == label && matches(&e.properties, predicates))
            .map(|e| e.properties.clone())
            .collect()
    }

    fn select_edges(&self, spec: &EdgeSpec, predicates: &[Predicate]) -> Vec<Row> {
        let anchor = |ref_column: &str| {
            predicates
                .iter()
                .find(|p| p.column == ref_column)
                .and_then(|p| p.value.as_deref())
        };

        if let Some(key) = anchor(spec.src.ref_column) {
            return match self.find_vertex(spec.src.collection, spec.src.key_column, key) {
                Some(id) => self.walk(&self.vertices[&id].out, spec.collection, predicates),
                None => Vec::new(),
            };
        }
        if let Some(key) = anchor(spec.dst.ref_column) {
            return match self.find_vertex(spec.dst.collection, spec.dst.key_column, key) {
                Some(id) => self.walk(&self.vertices[&id].inn, spec.collection, predicates),
                None => Vec::new(),
            };
        }
        // unanchored: traverse from every source-label vertex
        self.vertices_with_label(spec.src.collection)
            .flat_map(|(_, v)| self.walk(&v.out, spec.collection, predicates))
            .collect()
    }

    fn matching_edge_ids(&self, spec: &EdgeSpec, predicates: &[Predicate]) -> Vec<u64> {
        self.edges
            .iter()
            .filter(|(_, e)| e.label == spec.collection && matches(&e.properties, predicates))
            .map(|(&id, _)| id)
            .collect()
    }

    fn add_vertex(&mut self, label: &str, properties: Row, undo: &mut Vec<Undo>) {
        let id = self.fresh_id();
        self.vertices.insert(
            id,
            TraversalVertex {
                properties,
                out: Vec::new(),
                inn: Vec::new(),
            },
        );
        self.labels.entry(label.to_string()).or_default().push(id);
        undo.push(Undo::VertexAdded(id));
    }

    fn add_edge(&mut self, spec: &EdgeSpec, row: Row, undo: &mut Vec<Undo>) -> LodeResult<()> {
        let src = self.resolve_endpoint(spec, &row, true)?;
        let dst = self.resolve_endpoint(spec, &row, false)?;
        let id = self.fresh_id();
        self.edges.insert(
            id,
            TraversalEdge {
                label: spec.collection.to_string(),
                src,
                dst,
                properties: row,
            },
        );
        // recorded before the adjacency writes so a failure rolls the edge back
        undo.push(Undo::EdgeAdded(id));
        for (vertex, outgoing) in [(src, true), (dst, false)] {
            let v = self.vertices.get_mut(&vertex).ok_or_else(|| {
                LodeError::connection(format!(
                    "edge '{}' endpoint vertex vanished mid-commit",
                    spec.collection
                ))
            })?;
            if outgoing {
                v.out.push(id);
            } else {
                v.inn.push(id);
            }
        }
        Ok(())
    }

    fn resolve_endpoint(&self, spec: &EdgeSpec, row: &Row, source: bool) -> LodeResult<u64> {
        let end = if source { &spec.src } else { &spec.dst };
        let key = cell(row, end.ref_column).ok_or_else(|| {
            LodeError::connection(format!(
                "edge row '{}' is missing endpoint column '{}'",
                spec.collection, end.ref_column
            ))
        })?;
        self.find_vertex(end.collection, end.key_column, key)
            .ok_or_else(|| {
                LodeError::connection(format!(
                    "dangling edge '{}': no '{}' vertex with {}={}",
                    spec.collection, end.collection, end.key_column, key
                ))
            })
    }

    fn detach(&mut self, edge_id: u64, edge: &TraversalEdge) {
        if let Some(v) = self.vertices.get_mut(&edge.src) {
            v.out.retain(|&id| id != edge_id);
        }
        if let Some(v) = self.vertices.get_mut(&edge.dst) {
            v.inn.retain(|&id| id != edge_id);
        }
    }

    fn remove_edges(&mut self, spec: &EdgeSpec, predicates: &[Predicate], undo: &mut Vec<Undo>) {
        for id in self.matching_edge_ids(spec, predicates) {
            if let Some(edge) = self.edges.remove(&id) {
                self.detach(id, &edge);
                undo.push(Undo::EdgeRemoved(id, edge));
            }
        }
    }

    fn remove_vertices(&mut self, label: &str, predicates: &[Predicate], undo: &mut Vec<Undo>) {
        let ids: Vec<u64> = self
            .vertices_with_label(label)
            .filter(|(_, v)| matches(&v.properties, predicates))
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            if let Some(vertex) = self.vertices.remove(&id) {
                for edge_id in vertex.out.iter().chain(vertex.inn.iter()) {
                    if let Some(edge) = self.edges.remove(edge_id) {
                        self.detach(*edge_id, &edge);
                        undo.push(Undo::EdgeRemoved(*edge_id, edge));
                    }
                }
                undo.push(Undo::VertexRemoved(id, label.to_string(), vertex));
            }
        }
    }

    fn apply(&mut self, op: Op, undo: &mut Vec<Undo>) -> LodeResult<()> {
        match op {
            Op::Insert(collection, row) => match edge_spec(&collection) {
                Some(spec) => self.add_edge(spec, row, undo),
                None => {
                    self.add_vertex(&collection, row, undo);
                    Ok(())
                }
            },
            Op::Delete(collection, predicates) => {
                match edge_spec(&collection) {
                    Some(spec) => self.remove_edges(spec, &predicates, undo),
                    None => self.remove_vertices(&collection, &predicates, undo),
                }
                Ok(())
            }
        }
    }

    fn rollback(&mut self, undo: Vec<Undo>) {
        for entry in undo.into_iter().rev() {
            match entry {
                Undo::VertexAdded(id) => {
                    self.vertices.remove(&id);
                }
                Undo::EdgeAdded(id) => {
                    if let Some(edge) = self.edges.remove(&id) {
                        self.detach(id, &edge);
                    }
                }
                Undo::VertexRemoved(id, label, vertex) => {
                    self.vertices.insert(id, vertex);
                    let slots = self.labels.entry(label).or_default();
                    if !slots.contains(&id) {
                        slots.push(id);
                    }
                }
                Undo::EdgeRemoved(id, edge) => {
                    let (src, dst) = (edge.src, edge.dst);
                    self.edges.insert(id, edge);
                    if let Some(v) = self.vertices.get_mut(&src) {
                        if !v.out.contains(&id) {
                            v.out.push(id);
                        }
                    }
                    if let Some(v) = self.vertices.get_mut(&dst) {
                        if !v.inn.contains(&id) {
                            v.inn.push(id);
                        }
                    }
                }
            }
        }
    }
}

/// In-process traversal-graph store.
#[derive(Clone, Default)]
pub struct TraversalGraphStore {
    inner: Arc<RwLock<TraversalGraph>>,
}

impl TraversalGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for TraversalGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let g = self.inner.read();
        f.debug_struct("TraversalGraphStore")
            .field("vertices", &g.vertices.len())
            .field("edges", &g.edges.len())
            .finish()
    }
}

impl Backend for TraversalGraphStore {
    fn name(&self) -> &'static str {
        "traversal-graph"
    }

    fn connect(&self) -> LodeResult<Box<dyn Connection>> {
        Ok(Box::new(TraversalConnection {
            inner: Arc::clone(&self.inner),
            pending: Vec::new(),
            closed: false,
        }))
    }
}

struct TraversalConnection {
    inner: Arc<RwLock<TraversalGraph>>,
    pending: Vec<Op>,
    closed: bool,
}

impl Connection for TraversalConnection {
    fn equality_select(
        &mut self,
        collection: &str,
        projection: &[&str],
        predicates: &[Predicate],
    ) -> LodeResult<Vec<Row>> {
        ensure_open(self.closed)?;
        let mut rows = {
            let g = self.inner.read();
            match edge_spec(collection) {
                Some(spec) => g.select_edges(spec, predicates),
                None => g.select_vertices(collection, predicates),
            }
        };
        overlay(&mut rows, &self.pending, collection, predicates);
        Ok(rows.into_iter().map(|r| project(r, projection)).collect())
    }

    fn insert(&mut self, collection: &str, row: Row) -> LodeResult<()> {
        ensure_open(self.closed)?;
        self.pending.push(Op::Insert(collection.to_string(), row));
        Ok(())
    }

    fn delete(&mut self, collection: &str, predicates: &[Predicate]) -> LodeResult<()> {
        ensure_open(self.closed)?;
        self.pending
            .push(Op::Delete(collection.to_string(), predicates.to_vec()));
        Ok(())
    }

    fn commit(&mut self) -> LodeResult<()> {
        ensure_open(self.closed)?;
        let mut g = self.inner.write();
        let mut undo = Vec::new();
        for op in self.pending.drain(..) {
            if let Err(e) = g.apply(op, &mut undo) {
                g.rollback(undo);
                self.closed = true;
                return Err(e);
            }
        }
        self.closed = true;
        Ok(())
    }

    fn abort(&mut self) -> LodeResult<()> {
        if !self.closed {
            debug!(ops = self.pending.len(), "traversal transaction aborted");
        }
        self.pending.clear();
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RowBuilder;

    fn seed(store: &TraversalGraphStore) {
        let mut conn = store.connect().unwrap();
        conn.insert("item", RowBuilder::new().set("id", "1").build())
            .unwrap();
        for v in ["10", "11", "12"] {
            conn.insert(
                "version",
                RowBuilder::new().set("id", v).set("item_id", "1").build(),
            )
            .unwrap();
        }
        conn.commit().unwrap();
    }

    #[test]
    fn anchored_select_walks_out_edges() {
        let store = TraversalGraphStore::new();
        seed(&store);

        let mut conn = store.connect().unwrap();
        for parent in ["10", "11"] {
            conn.insert(
                "version_parent",
                RowBuilder::new()
                    .set("child_id", "12")
                    .set("parent_id", parent)
                    .build(),
            )
            .unwrap();
        }
        conn.commit().unwrap();

        let mut conn = store.connect().unwrap();
        let rows = conn
            .equality_select("version_parent", &[], &[Predicate::eq("child_id", "12")])
            .unwrap();
        assert_eq!(rows.len(), 2);

        // anchored on the destination side walks in-edges
        let rows = conn
            .equality_select("version_parent", &[], &[Predicate::eq("parent_id", "10")])
            .unwrap();
        assert_eq!(rows.len(), 1);
        conn.abort().unwrap();
    }

    #[test]
    fn anchored_select_on_missing_vertex_is_empty() {
        let store = TraversalGraphStore::new();
        seed(&store);
        let mut conn = store.connect().unwrap();
        let rows = conn
            .equality_select("version_parent", &[], &[Predicate::eq("child_id", "404")])
            .unwrap();
        assert!(rows.is_empty());
        conn.abort().unwrap();
    }

    #[test]
    fn failed_commit_rolls_back_adjacency() {
        let store = TraversalGraphStore::new();
        seed(&store);

        let mut conn = store.connect().unwrap();
        conn.insert(
            "version_parent",
            RowBuilder::new()
                .set("child_id", "11")
                .set("parent_id", "10")
                .build(),
        )
        .unwrap();
        conn.insert(
            "version_parent",
            RowBuilder::new()
                .set("child_id", "11")
                .set("parent_id", "404")
                .build(),
        )
        .unwrap();
        assert!(conn.commit().is_err());

        let g = store.inner.read();
        assert!(g.edges.is_empty());
        assert!(g.vertices.values().all(|v| v.out.is_empty() && v.inn.is_empty()));
    }

    #[test]
    fn edge_delete_detaches_both_sides() {
        let store = TraversalGraphStore::new();
        seed(&store);

        let mut conn = store.connect().unwrap();
        conn.insert(
            "item_leaf",
            RowBuilder::new()
                .set("item_id", "1")
                .set("version_id", "10")
                .build(),
        )
        .unwrap();
        conn.commit().unwrap();

        let mut conn = store.connect().unwrap();
        conn.delete(
            "item_leaf",
            &[Predicate::eq("item_id", "1"), Predicate::eq("version_id", "10")],
        )
        .unwrap();
        conn.commit().unwrap();

        let g = store.inner.read();
        assert!(g.edges.is_empty());
        assert!(g.vertices.values().all(|v| v.out.is_empty() && v.inn.is_empty()));
    }
}
