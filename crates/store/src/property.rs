//! Property-graph storage engine.
//!
//! Rows become labeled vertices with property maps; the model's link
//! collections become first-class edges between vertices resolved through
//! the static edge schema in [`crate::link`]. Deletion tombstones slots, and
//! commit keeps an undo log so a failed batch (e.g. a dangling edge) leaves
//! the graph untouched.

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
struct Vertex {
    label: String,
    properties: Row,
}

#[derive(Debug, Clone)]
struct EdgeRecord {
    label: String,
    src: usize,
    dst: usize,
    properties: Row,
}

#[derive(Debug, Default)]
struct PropertyGraph {
    vertices: Vec<Option<Vertex>>,
    edges: Vec<Option<EdgeRecord>>,
    vertex_labels: FxHashMap<String, Vec<usize>>,
    edge_labels: FxHashMap<String, Vec<usize>>,
}

/// Rollback entries for one commit batch, unwound in reverse on failure.
enum Undo {
    VertexAdded(usize),
    EdgeAdded(usize),
    VertexRemoved(usize, Vertex),
    EdgeRemoved(usize, EdgeRecord),
}

impl PropertyGraph {
    fn find_vertex(&self, label: &str, key_column: &str, key: &str) -> Option<usize> {
        self.vertex_labels.get(label)?.iter().copied().find(|&slot| {
            self.vertices[slot]
                .as_ref()
                .map(|v| cell(&v.properties, key_column) == Some(key))
                .unwrap_or(false)
        })
    }

    fn select_vertices(&self, label: &str, predicates: &[Predicate]) -> Vec<Row> {
        self.vertex_labels
            .get(label)
            .into_iter()
            .flatten()
            .filter_map(|&slot| self.vertices[slot].as_ref())
            .filter(|v| matches(&v.properties, predicates))
            .map(|v| v.properties.clone())
            .collect()
    }

    fn select_edges(&self, label: &str, predicates: &[Predicate]) -> Vec<Row> {
        self.edge_labels
            .get(label)
            .into_iter()
            .flatten()
            .filter_map(|&slot| self.edges[slot].as_ref())
            .filter(|e| matches(&e.properties, predicates))
            .map(|e| e.properties.clone())
            .collect()
    }

    fn add_vertex(&mut self, label: &str, properties: Row, undo: &mut Vec<Undo>) {
        let slot = self.vertices.len();
        self.vertices.push(Some(Vertex {
            label: label.to_string(),
            properties,
        }));
        self.vertex_labels
            .entry(label.to_string())
            .or_default()
            .push(slot);
        undo.push(Undo::VertexAdded(slot));
    }

    fn add_edge(&mut self, spec: &EdgeSpec, row: Row, undo: &mut Vec<Undo>) -> LodeResult<()> {
        let src = self.resolve_endpoint(spec, &row, spec.src.ref_column, spec.src.collection)?;
        let dst = self.resolve_endpoint(spec, &row, spec.dst.ref_column, spec.dst.collection)?;
        let slot = self.edges.len();
        self.edges.push(Some(EdgeRecord {
            label: spec.collection.to_string(),
            src,
            dst,
            properties: row,
        }));
        self.edge_labels
            .entry(spec.collection.to_string())
            .or_default()
            .push(slot);
        undo.push(Undo::EdgeAdded(slot));
        Ok(())
    }

    fn resolve_endpoint(
        &self,
        spec: &EdgeSpec,
        row: &Row,
        ref_column: &str,
        target: &str,
    ) -> LodeResult<usize> {
        let key = cell(row, ref_column).ok_or_else(|| {
            LodeError::connection(format!(
                "edge row '{}' is missing endpoint column '{}'",
                spec.collection, ref_column
            ))
        })?;
        let key_column = if ref_column == spec.src.ref_column {
            spec.src.key_column
        } else {
            spec.dst.key_column
        };
        self.find_vertex(target, key_column, key).ok_or_else(|| {
            LodeError::connection(format!(
                "dangling edge '{}': no '{}' vertex with {}={}",
                spec.collection, target, key_column, key
            ))
        })
    }

    fn remove_edges(&mut self, label: &str, predicates: &[Predicate], undo: &mut Vec<Undo>) {
        let slots: Vec<usize> = self
            .edge_labels
            .get(label)
            .into_iter()
            .flatten()
            .copied()
            .collect();
        for slot in slots {
            let dead = self.edges[slot]
                .as_ref()
                .map(|e| matches(&e.properties, predicates))
                .unwrap_or(false);
            if dead {
                if let Some(record) = self.edges[slot].take() {
                    undo.push(Undo::EdgeRemoved(slot, record));
                }
            }
        }
    }

    fn remove_vertices(&mut self, label: &str, predicates: &[Predicate], undo: &mut Vec<Undo>) {
        let slots: Vec<usize> = self
            .vertex_labels
            .get(label)
            .into_iter()
            .flatten()
            .copied()
            .collect();
        for slot in slots {
            let dead = self.vertices[slot]
                .as_ref()
                .map(|v| matches(&v.properties, predicates))
                .unwrap_or(false);
            if !dead {
                continue;
            }
            // drop incident edges with the vertex
            for edge_slot in 0..self.edges.len() {
                let incident = self.edges[edge_slot]
                    .as_ref()
                    .map(|e| e.src == slot || e.dst == slot)
                    .unwrap_or(false);
                if incident {
                    if let Some(record) = self.edges[edge_slot].take() {
                        undo.push(Undo::EdgeRemoved(edge_slot, record));
                    }
                }
            }
            if let Some(vertex) = self.vertices[slot].take() {
                undo.push(Undo::VertexRemoved(slot, vertex));
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
                if edge_spec(&collection).is_some() {
                    self.remove_edges(&collection, &predicates, undo);
                } else {
                    self.remove_vertices(&collection, &predicates, undo);
                }
                Ok(())
            }
        }
    }

    fn rollback(&mut self, undo: Vec<Undo>) {
        for entry in undo.into_iter().rev() {
            match entry {
                // label-index entries for undone adds go stale; readers skip
                // empty slots
                Undo::VertexAdded(slot) => self.vertices[slot] = None,
                Undo::EdgeAdded(slot) => self.edges[slot] = None,
                Undo::VertexRemoved(slot, vertex) => self.vertices[slot] = Some(vertex),
                Undo::EdgeRemoved(slot, record) => self.edges[slot] = Some(record),
            }
        }
    }
}

/// In-process labeled-property-graph store.
#[derive(Clone, Default)]
pub struct PropertyGraphStore {
    inner: Arc<RwLock<PropertyGraph>>,
}

impl PropertyGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for PropertyGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let g = self.inner.read();
        f.debug_struct("PropertyGraphStore")
            .field("vertices", &g.vertices.iter().flatten().count())
            .field("edges", &g.edges.iter().flatten().count())
            .finish()
    }
}

impl Backend for PropertyGraphStore {
    fn name(&self) -> &'static str {
        "property-graph"
    }

    fn connect(&self) -> LodeResult<Box<dyn Connection>> {
        Ok(Box::new(PropertyConnection {
            inner: Arc::clone(&self.inner),
            pending: Vec::new(),
            closed: false,
        }))
    }
}

struct PropertyConnection {
    inner: Arc<RwLock<PropertyGraph>>,
    pending: Vec<Op>,
    closed: bool,
}

impl Connection for PropertyConnection {
    fn equality_select(
        &mut self,
        collection: &str,
        projection: &[&str],
        predicates: &[Predicate],
    ) -> LodeResult<Vec<Row>> {
        ensure_open(self.closed)?;
        let mut rows = {
            let g = self.inner.read();
            if edge_spec(collection).is_some() {
                g.select_edges(collection, predicates)
            } else {
                g.select_vertices(collection, predicates)
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
            debug!(ops = self.pending.len(), "property-graph transaction aborted");
        }
        self.pending.clear();
        self.closed = true;
        Ok(())
    }
}
