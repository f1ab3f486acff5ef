//! The rich-version layer shared by graph, node, edge, and lineage-edge
//! versions: tags, optional structure conformance, and external references.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lode_core::schema::{collection, column};
use lode_core::tag::tags_for_owner;
use lode_core::{LodeError, LodeResult, Tag, TagValue, VersionId};
use lode_engine::{TagIndex, TagNamespace};
use lode_store::{cell, require_cell, Connection, Predicate, RowBuilder};

use crate::structure::load_attributes;

/// The common slice of every rich version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichVersion {
    pub id: VersionId,
    pub tags: BTreeMap<String, Tag>,
    /// Schema this version claims conformance to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure_version_id: Option<VersionId>,
    /// Reference to the data artifact outside the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reference_parameters: BTreeMap<String, String>,
}

/// Caller-facing arguments for creating any rich version.
#[derive(Debug, Clone, Default)]
pub struct RichVersionArgs {
    pub tags: BTreeMap<String, Option<TagValue>>,
    pub structure_version_id: Option<VersionId>,
    pub reference: Option<String>,
    pub reference_parameters: BTreeMap<String, String>,
}

/// Reads and writes of the rich-version collections.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RichVersionStore {
    tags: TagIndex,
}

impl RichVersionStore {
    /// Persist the rich slice for a version already inserted into the DAG.
    ///
    /// When a structure version is referenced, the tags are checked against
    /// its declared attributes first.
    pub(crate) fn insert(
        &self,
        conn: &mut dyn Connection,
        id: VersionId,
        args: &RichVersionArgs,
    ) -> LodeResult<RichVersion> {
        let tags = tags_for_owner(id.as_u64(), &args.tags);
        if let Some(structure_version_id) = args.structure_version_id {
            check_conformance(conn, structure_version_id, &tags)?;
        }

        conn.insert(
            collection::RICH_VERSION,
            RowBuilder::new()
                .set(column::ID, id.to_string())
                .set_opt(
                    column::STRUCTURE_VERSION_ID,
                    args.structure_version_id.map(|v| v.to_string()),
                )
                .set_opt(column::REFERENCE, args.reference.clone())
                .build(),
        )?;
        for (key, value) in &args.reference_parameters {
            conn.insert(
                collection::RICH_VERSION_PARAMETER,
                RowBuilder::new()
                    .set(column::RICH_VERSION_ID, id.to_string())
                    .set(column::KEY, key.clone())
                    .set(column::VALUE, value.clone())
                    .build(),
            )?;
        }
        self.tags
            .put_tags(conn, TagNamespace::Version, id.as_u64(), &tags)?;

        Ok(RichVersion {
            id,
            tags,
            structure_version_id: args.structure_version_id,
            reference: args.reference.clone(),
            reference_parameters: args.reference_parameters.clone(),
        })
    }

    /// Read the rich slice back; `NotFound` when the version is absent.
    pub(crate) fn retrieve(
        &self,
        conn: &mut dyn Connection,
        id: VersionId,
    ) -> LodeResult<RichVersion> {
        let row = conn
            .get_vertex(
                collection::RICH_VERSION,
                &[Predicate::eq(column::ID, id.to_string())],
            )
            .map_err(|e| {
                if e.is_not_found() {
                    LodeError::not_found(format!("version {}", id))
                } else {
                    e
                }
            })?;

        let structure_version_id = match cell(&row, column::STRUCTURE_VERSION_ID) {
            Some(literal) => Some(VersionId(literal.parse().map_err(|_| {
                LodeError::connection(format!(
                    "version {} has non-numeric structure version id",
                    id
                ))
            })?)),
            None => None,
        };
        let reference = cell(&row, column::REFERENCE).map(str::to_string);

        let mut reference_parameters = BTreeMap::new();
        let rows = conn.equality_select(
            collection::RICH_VERSION_PARAMETER,
            &[column::KEY, column::VALUE],
            &[Predicate::eq(column::RICH_VERSION_ID, id.to_string())],
        )?;
        for row in &rows {
            reference_parameters.insert(
                require_cell(row, column::KEY)?.to_string(),
                require_cell(row, column::VALUE)?.to_string(),
            );
        }

        let tags = self.tags.get_tags(conn, TagNamespace::Version, id.as_u64())?;
        Ok(RichVersion {
            id,
            tags,
            structure_version_id,
            reference,
            reference_parameters,
        })
    }
}

/// Every attribute the structure version declares must be present as a tag
/// with a non-null value of the declared type. Extra tags are allowed.
fn check_conformance(
    conn: &mut dyn Connection,
    structure_version_id: VersionId,
    tags: &BTreeMap<String, Tag>,
) -> LodeResult<()> {
    let attributes = load_attributes(conn, structure_version_id)?;

    let mut violations = Vec::new();
    for (attribute, expected) in &attributes {
        match tags.get(attribute).and_then(Tag::value_type) {
            Some(actual) if actual == *expected => {}
            Some(actual) => violations.push(format!(
                "'{}' expects {}, got {}",
                attribute, expected, actual
            )),
            None => violations.push(format!("'{}' expects {}, missing or null", attribute, expected)),
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(LodeError::conformance(format!(
            "version does not conform to structure version {}: {}",
            structure_version_id,
            violations.join("; ")
        )))
    }
}
