//! Core types for the Lode metadata catalog.
//!
//! This crate holds everything the storage and engine layers agree on:
//! item/version identifiers, the tagged-value codec, the `Tag` annotation
//! type, the error taxonomy, the ID-generation service, and the abstract
//! names of the persisted collections.

pub mod error;
pub mod id;
pub mod schema;
pub mod tag;
pub mod types;
pub mod value;

pub use error::{LodeError, LodeResult};
pub use id::IdGenerator;
pub use tag::Tag;
pub use types::{ItemId, VersionId};
pub use value::{decode, encode, TagValue, TagValueType};
