//! Column-family storage engine.
//!
//! Tables hold append-only row slots with tombstone deletion, plus a
//! per-column value index so equality selects touch only candidate rows
//! (O(matches), not O(table)); the reverse tag lookup on the `key` column
//! relies on this. Index entries are never rewritten on delete; readers skip
//! tombstones and re-check predicates.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use lode_core::LodeResult;

use crate::{ensure_open, matches, overlay, project, Backend, Connection, Op, Predicate, Row};

/// One column family: row slots plus column -> literal -> slot index.
#[derive(Debug, Default)]
struct Table {
    rows: Vec<Option<Row>>,
    index: FxHashMap<String, FxHashMap<String, Vec<usize>>>,
}

impl Table {
    fn insert(&mut self, row: Row) {
        let slot = self.rows.len();
        for (column, value) in &row {
            if let Some(literal) = value {
                self.index
                    .entry(column.clone())
                    .or_default()
                    .entry(literal.clone())
                    .or_default()
                    .push(slot);
            }
        }
        self.rows.push(Some(row));
    }

    /// Slots that could match, via the first indexable predicate; falls back
    /// to a full scan when every predicate is null-valued (or absent).
    fn candidates(&self, predicates: &[Predicate]) -> Vec<usize> {
        for p in predicates {
            let literal = match &p.value {
                Some(l) => l,
                None => continue,
            };
            return self
                .index
                .get(&p.column)
                .and_then(|by_value| by_value.get(literal))
                .cloned()
                .unwrap_or_default();
        }
        (0..self.rows.len()).collect()
    }

    fn matching(&self, predicates: &[Predicate]) -> Vec<Row> {
        self.candidates(predicates)
            .into_iter()
            .filter_map(|slot| self.rows[slot].as_ref())
            .filter(|row| matches(row, predicates))
            .cloned()
            .collect()
    }

    fn delete(&mut self, predicates: &[Predicate]) {
        for slot in self.candidates(predicates) {
            let dead = match &self.rows[slot] {
                Some(row) => matches(row, predicates),
                None => false,
            };
            if dead {
                self.rows[slot] = None;
            }
        }
    }
}

/// In-process column-family store.
///
/// Tables live behind one store-wide [`RwLock`]: selects share the read
/// guard, and a commit holds the write guard across its whole batch, so a
/// concurrent reader sees either none or all of a transaction.
#[derive(Clone, Default)]
pub struct ColumnStore {
    tables: Arc<RwLock<FxHashMap<String, Table>>>,
}

impl ColumnStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for ColumnStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnStore")
            .field("tables", &self.tables.read().len())
            .finish()
    }
}

impl Backend for ColumnStore {
    fn name(&self) -> &'static str {
        "column"
    }

    fn connect(&self) -> LodeResult<Box<dyn Connection>> {
        Ok(Box::new(ColumnConnection {
            tables: Arc::clone(&self.tables),
            pending: Vec::new(),
            closed: false,
        }))
    }
}

struct ColumnConnection {
    tables: Arc<RwLock<FxHashMap<String, Table>>>,
    pending: Vec<Op>,
    closed: bool,
}

impl Connection for ColumnConnection {
    fn equality_select(
        &mut self,
        collection: &str,
        projection: &[&str],
        predicates: &[Predicate],
    ) -> LodeResult<Vec<Row>> {
        ensure_open(self.closed)?;
        let mut rows = {
            let tables = self.tables.read();
            match tables.get(collection) {
                Some(table) => table.matching(predicates),
                None => Vec::new(),
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
        // the write guard spans the whole batch; readers see all or nothing
        let mut tables = self.tables.write();
        for op in self.pending.drain(..) {
            match op {
                Op::Insert(collection, row) => {
                    tables.entry(collection).or_default().insert(row);
                }
                Op::Delete(collection, predicates) => {
                    if let Some(table) = tables.get_mut(&collection) {
                        table.delete(&predicates);
                    }
                }
            }
        }
        self.closed = true;
        Ok(())
    }

    fn abort(&mut self) -> LodeResult<()> {
        if !self.closed {
            debug!(ops = self.pending.len(), "column transaction aborted");
        }
        self.pending.clear();
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cell, RowBuilder};

    fn store_with_tags() -> ColumnStore {
        let store = ColumnStore::new();
        let mut conn = store.connect().unwrap();
        for (owner, key) in [("1", "status"), ("2", "owner"), ("3", "status")] {
            conn.insert(
                "item_tag",
                RowBuilder::new()
                    .set("item_id", owner)
                    .set("key", key)
                    .set_null("value")
                    .build(),
            )
            .unwrap();
        }
        conn.commit().unwrap();
        store
    }

    #[test]
    fn indexed_select_returns_only_matches() {
        let store = store_with_tags();
        let mut conn = store.connect().unwrap();
        let rows = conn
            .equality_select("item_tag", &["item_id"], &[Predicate::eq("key", "status")])
            .unwrap();
        let mut owners: Vec<_> = rows.iter().map(|r| cell(r, "item_id").unwrap()).collect();
        owners.sort_unstable();
        assert_eq!(owners, ["1", "3"]);
        conn.abort().unwrap();
    }

    #[test]
    fn select_on_unknown_table_is_empty_not_error() {
        let store = ColumnStore::new();
        let mut conn = store.connect().unwrap();
        let rows = conn.equality_select("nowhere", &[], &[]).unwrap();
        assert!(rows.is_empty());
        conn.abort().unwrap();
    }

    #[test]
    fn tombstoned_rows_disappear_despite_stale_index() {
        let store = store_with_tags();
        let mut conn = store.connect().unwrap();
        conn.delete("item_tag", &[Predicate::eq("item_id", "1")])
            .unwrap();
        conn.commit().unwrap();

        let mut conn = store.connect().unwrap();
        let rows = conn
            .equality_select("item_tag", &[], &[Predicate::eq("key", "status")])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(cell(&rows[0], "item_id"), Some("3"));
        conn.abort().unwrap();
    }

    #[test]
    fn null_predicate_falls_back_to_scan() {
        let store = store_with_tags();
        let mut conn = store.connect().unwrap();
        let rows = conn
            .equality_select("item_tag", &[], &[Predicate::is_null("value")])
            .unwrap();
        assert_eq!(rows.len(), 3);
        conn.abort().unwrap();
    }

    #[test]
    fn closed_connection_rejects_further_work() {
        let store = ColumnStore::new();
        let mut conn = store.connect().unwrap();
        conn.commit().unwrap();
        assert!(conn.insert("item", Row::default()).is_err());
        assert!(conn.commit().is_err());
        // abort stays idempotent after close
        assert!(conn.abort().is_ok());
        assert!(conn.abort().is_ok());
    }
}
