//! The versioned-item engine and tag index for the Lode catalog.
//!
//! This crate contains the backend-agnostic algorithms: tag storage with
//! reverse lookup, and the DAG engine that appends versions and maintains
//! each item's leaf frontier incrementally. Everything here runs through a
//! `Connection` and never touches engine-specific types.

pub mod item;
pub mod tag_index;

pub use item::{ItemEngine, ItemRecord};
pub use tag_index::{TagIndex, TagNamespace};
