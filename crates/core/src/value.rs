//! Tagged-value codec.
//!
//! Tags carry typed scalar values. Each backend persists them as nullable
//! string literals plus a type column; [`encode`] and [`decode`] are the
//! single translation point between the typed form and that representation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LodeError, LodeResult};

/// The scalar types a tag value may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagValueType {
    String,
    Integer,
    Boolean,
    Long,
}

impl TagValueType {
    /// Persisted form of the type discriminant.
    pub fn as_str(self) -> &'static str {
        match self {
            TagValueType::String => "string",
            TagValueType::Integer => "integer",
            TagValueType::Boolean => "boolean",
            TagValueType::Long => "long",
        }
    }

    /// Parse a persisted type discriminant.
    pub fn parse(s: &str) -> LodeResult<Self> {
        match s {
            "string" => Ok(TagValueType::String),
            "integer" => Ok(TagValueType::Integer),
            "boolean" => Ok(TagValueType::Boolean),
            "long" => Ok(TagValueType::Long),
            other => Err(LodeError::unknown_type(format!(
                "'{}' is not a tag value type",
                other
            ))),
        }
    }
}

impl fmt::Display for TagValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed scalar tag value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagValue {
    String(String),
    Integer(i32),
    Boolean(bool),
    Long(i64),
}

impl TagValue {
    /// The type discriminant of this value.
    pub fn value_type(&self) -> TagValueType {
        match self {
            TagValue::String(_) => TagValueType::String,
            TagValue::Integer(_) => TagValueType::Integer,
            TagValue::Boolean(_) => TagValueType::Boolean,
            TagValue::Long(_) => TagValueType::Long,
        }
    }
}

/// Encode a typed value into its backend-native literal.
pub fn encode(value: &TagValue) -> String {
    match value {
        TagValue::String(s) => s.clone(),
        TagValue::Integer(i) => i.to_string(),
        TagValue::Boolean(b) => b.to_string(),
        TagValue::Long(l) => l.to_string(),
    }
}

/// Decode a backend-native literal back into a typed value.
///
/// A `None` literal decodes to `None` regardless of the declared type, and a
/// literal with no declared type is a presence-only tag (also `None`).
/// Malformed numeric or boolean literals fail with
/// [`LodeError::UnknownType`].
pub fn decode(literal: Option<&str>, ty: Option<TagValueType>) -> LodeResult<Option<TagValue>> {
    let (literal, ty) = match (literal, ty) {
        (Some(l), Some(t)) => (l, t),
        _ => return Ok(None),
    };

    let value = match ty {
        TagValueType::String => TagValue::String(literal.to_string()),
        TagValueType::Integer => TagValue::Integer(literal.parse().map_err(|_| {
            LodeError::unknown_type(format!("'{}' is not an integer literal", literal))
        })?),
        TagValueType::Boolean => TagValue::Boolean(literal.parse().map_err(|_| {
            LodeError::unknown_type(format!("'{}' is not a boolean literal", literal))
        })?),
        TagValueType::Long => TagValue::Long(literal.parse().map_err(|_| {
            LodeError::unknown_type(format!("'{}' is not a long literal", literal))
        })?),
    };
    Ok(Some(value))
}
