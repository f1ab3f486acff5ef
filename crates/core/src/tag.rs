//! Typed key-value annotations on items and versions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::{TagValue, TagValueType};

/// A typed annotation attached to an item or a version.
///
/// The `(owner, key)` pair is unique within its namespace; a `None` value is
/// a presence-only tag (persisted with null value and null type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Raw id of the owning item or version.
    pub owner_id: u64,
    /// Tag key, unique per owner within a namespace.
    pub key: String,
    /// Optional typed value.
    pub value: Option<TagValue>,
}

impl Tag {
    /// Build a tag for the given owner.
    pub fn new(owner_id: u64, key: impl Into<String>, value: Option<TagValue>) -> Self {
        Tag {
            owner_id,
            key: key.into(),
            value,
        }
    }

    /// Type discriminant of the value, if any.
    pub fn value_type(&self) -> Option<TagValueType> {
        self.value.as_ref().map(TagValue::value_type)
    }
}

/// Materialize caller-supplied tag values into [`Tag`] rows for a fresh owner.
///
/// Factories accept plain `key -> value` maps so callers never construct
/// owner ids themselves.
pub fn tags_for_owner(
    owner_id: u64,
    values: &BTreeMap<String, Option<TagValue>>,
) -> BTreeMap<String, Tag> {
    values
        .iter()
        .map(|(key, value)| (key.clone(), Tag::new(owner_id, key.clone(), value.clone())))
        .collect()
}
