//! Backend connection abstraction for the Lode catalog.
//!
//! Every storage engine exposes the same unit-of-work contract: open a
//! connection, run equality-predicate selects, buffer inserts and deletes,
//! then commit the batch atomically or abort it. Three structurally
//! different engines satisfy the contract:
//!
//! - [`ColumnStore`]: column-family tables with tombstone deletion and
//!   per-column value indexes;
//! - [`PropertyGraphStore`]: labeled vertices with first-class edges;
//! - [`TraversalGraphStore`]: adjacency-list vertices queried by traversal.
//!
//! Callers never see engine-specific types; observable semantics are
//! identical across all three (verified by the shared contract tests).

pub mod column;
mod link;
pub mod property;
pub mod traversal;

use rustc_hash::FxHashMap;

use lode_core::{LodeError, LodeResult};

pub use column::ColumnStore;
pub use property::PropertyGraphStore;
pub use traversal::TraversalGraphStore;

/// A persisted row (or vertex/edge property map): column name to nullable
/// string literal.
pub type Row = FxHashMap<String, Option<String>>;

/// Fluent builder for [`Row`] values.
#[derive(Debug, Default)]
pub struct RowBuilder {
    row: Row,
}

impl RowBuilder {
    /// Start an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column to a non-null literal.
    pub fn set(mut self, column: &str, value: impl Into<String>) -> Self {
        self.row.insert(column.to_string(), Some(value.into()));
        self
    }

    /// Set a column to an optional literal.
    pub fn set_opt(mut self, column: &str, value: Option<String>) -> Self {
        self.row.insert(column.to_string(), value);
        self
    }

    /// Set a column to null.
    pub fn set_null(mut self, column: &str) -> Self {
        self.row.insert(column.to_string(), None);
        self
    }

    /// Finish the row.
    pub fn build(self) -> Row {
        self.row
    }
}

/// An equality predicate over one column. A `None` value matches null (or
/// absent) cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub value: Option<String>,
}

impl Predicate {
    /// `column = value`.
    pub fn eq(column: &str, value: impl Into<String>) -> Self {
        Predicate {
            column: column.to_string(),
            value: Some(value.into()),
        }
    }

    /// `column IS NULL`.
    pub fn is_null(column: &str) -> Self {
        Predicate {
            column: column.to_string(),
            value: None,
        }
    }
}

/// Non-null cell access: `Some` only when the column is present and non-null.
pub fn cell<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    row.get(column).and_then(|v| v.as_deref())
}

/// Cell access that treats a missing or null cell as corrupt persisted state.
pub fn require_cell<'a>(row: &'a Row, column: &str) -> LodeResult<&'a str> {
    cell(row, column)
        .ok_or_else(|| LodeError::connection(format!("row is missing column '{}'", column)))
}

/// [`require_cell`] plus numeric parsing, for id columns.
pub fn require_u64(row: &Row, column: &str) -> LodeResult<u64> {
    let literal = require_cell(row, column)?;
    literal.parse().map_err(|_| {
        LodeError::connection(format!(
            "column '{}' holds non-numeric literal '{}'",
            column, literal
        ))
    })
}

/// One logical transaction against a backend.
///
/// Reads see this connection's own uncommitted writes layered over committed
/// state. Nothing is observable to other connections until [`commit`].
/// Exactly one of [`commit`] / [`abort`] must be called before the
/// connection is dropped; [`abort`] is idempotent.
///
/// [`commit`]: Connection::commit
/// [`abort`]: Connection::abort
pub trait Connection: Send {
    /// Rows matching the conjunction of equality predicates.
    ///
    /// An empty result is not an error. An empty `projection` selects all
    /// columns.
    fn equality_select(
        &mut self,
        collection: &str,
        projection: &[&str],
        predicates: &[Predicate],
    ) -> LodeResult<Vec<Row>>;

    /// Buffer a row (vertex/edge) insert.
    fn insert(&mut self, collection: &str, row: Row) -> LodeResult<()>;

    /// Buffer deletion of every row matching the predicates.
    fn delete(&mut self, collection: &str, predicates: &[Predicate]) -> LodeResult<()>;

    /// Fetch exactly one matching row.
    ///
    /// Fails with `NotFound` when nothing matches; when several rows match,
    /// any one of them may be returned (callers supply selective predicates).
    fn get_vertex(&mut self, collection: &str, predicates: &[Predicate]) -> LodeResult<Row> {
        let rows = self.equality_select(collection, &[], predicates)?;
        rows.into_iter().next().ok_or_else(|| {
            LodeError::not_found(format!("no '{}' row matches the predicates", collection))
        })
    }

    /// Atomically apply all buffered operations in issue order.
    fn commit(&mut self) -> LodeResult<()>;

    /// Discard all buffered operations. Safe to call repeatedly and when
    /// nothing was written.
    fn abort(&mut self) -> LodeResult<()>;
}

/// A storage engine able to hand out connections.
pub trait Backend: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &'static str;

    /// Open a connection scoped to one logical transaction.
    fn connect(&self) -> LodeResult<Box<dyn Connection>>;
}

/// A buffered transaction operation, applied at commit.
#[derive(Debug, Clone)]
pub(crate) enum Op {
    Insert(String, Row),
    Delete(String, Vec<Predicate>),
}

/// Does the row satisfy every predicate? Missing columns compare as null.
pub(crate) fn matches(row: &Row, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|p| {
        let cell = row.get(&p.column).and_then(|v| v.as_deref());
        cell == p.value.as_deref()
    })
}

/// Layer this connection's pending operations over committed rows, keeping
/// only rows that satisfy `predicates`.
pub(crate) fn overlay(rows: &mut Vec<Row>, pending: &[Op], collection: &str, predicates: &[Predicate]) {
    for op in pending {
        match op {
            Op::Insert(c, row) if c == collection && matches(row, predicates) => {
                rows.push(row.clone());
            }
            Op::Delete(c, delete_predicates) if c == collection => {
                rows.retain(|row| !matches(row, delete_predicates));
            }
            _ => {}
        }
    }
}

/// Keep only the projected columns (empty projection keeps all).
pub(crate) fn project(row: Row, projection: &[&str]) -> Row {
    if projection.is_empty() {
        return row;
    }
    let mut projected = Row::default();
    for (column, value) in row {
        if projection.contains(&column.as_str()) {
            projected.insert(column, value);
        }
    }
    projected
}

/// Guard for connections that have already committed or aborted.
pub(crate) fn ensure_open(closed: bool) -> LodeResult<()> {
    if closed {
        Err(LodeError::connection("transaction already closed"))
    } else {
        Ok(())
    }
}
