//! Error taxonomy for catalog operations.
//!
//! Every fallible operation in the workspace returns [`LodeResult`]. Empty
//! results (no tags, no matching rows) are never errors; single-entity
//! lookups that miss are [`LodeError::NotFound`].

use thiserror::Error;

/// Result alias used across the Lode crates.
pub type LodeResult<T> = Result<T, LodeError>;

/// All errors surfaced by catalog operations.
///
/// Any of these raised mid-transaction triggers an abort before propagating,
/// so the backend never observes a partial write.
#[derive(Debug, Error)]
pub enum LodeError {
    /// A single-entity lookup found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// An insert collided with an existing identifier or name.
    #[error("duplicate id: {0}")]
    DuplicateId(String),

    /// A declared parent version is not part of the item's DAG.
    #[error("invalid parent: {0}")]
    InvalidParent(String),

    /// A version's payload violates the referenced structure version.
    #[error("structure conformance: {0}")]
    StructureConformance(String),

    /// An unrecognized or malformed tag-type literal.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// Backend unreachable, transaction failure, or corrupt persisted state.
    #[error("connection: {0}")]
    Connection(String),
}

impl LodeError {
    /// Build a [`LodeError::NotFound`].
    pub fn not_found(msg: impl Into<String>) -> Self {
        LodeError::NotFound(msg.into())
    }

    /// Build a [`LodeError::DuplicateId`].
    pub fn duplicate_id(msg: impl Into<String>) -> Self {
        LodeError::DuplicateId(msg.into())
    }

    /// Build a [`LodeError::InvalidParent`].
    pub fn invalid_parent(msg: impl Into<String>) -> Self {
        LodeError::InvalidParent(msg.into())
    }

    /// Build a [`LodeError::StructureConformance`].
    pub fn conformance(msg: impl Into<String>) -> Self {
        LodeError::StructureConformance(msg.into())
    }

    /// Build a [`LodeError::UnknownType`].
    pub fn unknown_type(msg: impl Into<String>) -> Self {
        LodeError::UnknownType(msg.into())
    }

    /// Build a [`LodeError::Connection`].
    pub fn connection(msg: impl Into<String>) -> Self {
        LodeError::Connection(msg.into())
    }

    /// True when this is a missing-entity error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LodeError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_and_message() {
        let err = LodeError::not_found("graph named 'orders'");
        assert_eq!(err.to_string(), "not found: graph named 'orders'");

        let err = LodeError::invalid_parent("version 9 does not belong to item 3");
        assert!(err.to_string().starts_with("invalid parent:"));
    }

    #[test]
    fn is_not_found_only_matches_not_found() {
        assert!(LodeError::not_found("x").is_not_found());
        assert!(!LodeError::duplicate_id("x").is_not_found());
        assert!(!LodeError::connection("x").is_not_found());
    }
}
