//! Structures: named, versioned attribute schemas.
//!
//! A structure version declares `attribute -> type` pairs; rich versions that
//! reference it are checked against those declarations at creation time.
//! Structure versions are the one version kind without the rich layer.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use lode_core::schema::{collection, column};
use lode_core::{IdGenerator, ItemId, LodeError, LodeResult, Tag, TagValue, TagValueType, VersionId};
use lode_store::{require_cell, require_u64, Backend, Connection, Predicate, RowBuilder};

use crate::base::EntityBase;
use crate::txn::with_connection;

/// A named attribute schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub id: ItemId,
    pub name: String,
    pub tags: BTreeMap<String, Tag>,
}

/// One revision of a structure's declared attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureVersion {
    pub id: VersionId,
    pub structure_id: ItemId,
    pub attributes: BTreeMap<String, TagValueType>,
}

/// Creates and retrieves structures and their versions.
#[derive(Clone)]
pub struct StructureFactory {
    backend: Arc<dyn Backend>,
    ids: Arc<IdGenerator>,
    base: EntityBase,
}

impl StructureFactory {
    pub(crate) fn new(backend: Arc<dyn Backend>, ids: Arc<IdGenerator>) -> Self {
        StructureFactory {
            backend,
            ids,
            base: EntityBase::new(collection::STRUCTURE, "structure"),
        }
    }

    pub fn create(
        &self,
        name: &str,
        tags: &BTreeMap<String, Option<TagValue>>,
    ) -> LodeResult<Structure> {
        let (id, tags) = with_connection(self.backend.as_ref(), |conn| {
            self.base.create_item(conn, &self.ids, name, tags)
        })?;
        info!(structure = name, id = %id, "created structure");
        Ok(Structure {
            id,
            name: name.to_string(),
            tags,
        })
    }

    pub fn retrieve(&self, name: &str) -> LodeResult<Structure> {
        let (id, tags) =
            with_connection(self.backend.as_ref(), |conn| self.base.retrieve_item(conn, name))?;
        info!(structure = name, id = %id, "retrieved structure");
        Ok(Structure {
            id,
            name: name.to_string(),
            tags,
        })
    }

    /// Link an already persisted version under new parents.
    ///
    /// Parents must not be descendants of the child; ancestry is not
    /// re-walked.
    pub fn update(
        &self,
        item_id: ItemId,
        child_id: VersionId,
        parent_ids: &[VersionId],
    ) -> LodeResult<()> {
        with_connection(self.backend.as_ref(), |conn| {
            self.base.engine.link_version(conn, item_id, child_id, parent_ids)
        })
    }

    /// Leaf frontier of the named structure's version DAG.
    pub fn leaves(&self, name: &str) -> LodeResult<Vec<VersionId>> {
        with_connection(self.backend.as_ref(), |conn| {
            let (id, _) = self.base.retrieve_item(conn, name)?;
            self.base.engine.get_leaves(conn, id)
        })
    }

    pub fn create_version(
        &self,
        structure_id: ItemId,
        attributes: &BTreeMap<String, TagValueType>,
        parent_ids: &[VersionId],
    ) -> LodeResult<StructureVersion> {
        let id = self.ids.next_version_id();
        with_connection(self.backend.as_ref(), |conn| {
            self.base
                .engine
                .insert_version(conn, structure_id, id, parent_ids)?;
            conn.insert(
                collection::STRUCTURE_VERSION,
                RowBuilder::new()
                    .set(column::ID, id.to_string())
                    .set(column::STRUCTURE_ID, structure_id.to_string())
                    .build(),
            )?;
            for (attribute, ty) in attributes {
                conn.insert(
                    collection::STRUCTURE_VERSION_ATTRIBUTE,
                    RowBuilder::new()
                        .set(column::STRUCTURE_VERSION_ID, id.to_string())
                        .set(column::KEY, attribute.clone())
                        .set(column::TYPE, ty.as_str())
                        .build(),
                )?;
            }
            Ok(())
        })?;
        info!(structure = %structure_id, version = %id, attributes = attributes.len(), "created structure version");
        Ok(StructureVersion {
            id,
            structure_id,
            attributes: attributes.clone(),
        })
    }

    pub fn retrieve_version(&self, id: VersionId) -> LodeResult<StructureVersion> {
        with_connection(self.backend.as_ref(), |conn| {
            let row = conn
                .get_vertex(
                    collection::STRUCTURE_VERSION,
                    &[Predicate::eq(column::ID, id.to_string())],
                )
                .map_err(not_found_rewrite(id))?;
            let structure_id = ItemId(require_u64(&row, column::STRUCTURE_ID)?);
            let attributes = load_attributes(conn, id)?;
            Ok(StructureVersion {
                id,
                structure_id,
                attributes,
            })
        })
    }
}

/// Declared attributes of a structure version; `NotFound` when the version
/// does not exist. Shared with the rich-version conformance check.
pub(crate) fn load_attributes(
    conn: &mut dyn Connection,
    structure_version_id: VersionId,
) -> LodeResult<BTreeMap<String, TagValueType>> {
    conn.get_vertex(
        collection::STRUCTURE_VERSION,
        &[Predicate::eq(column::ID, structure_version_id.to_string())],
    )
    .map_err(not_found_rewrite(structure_version_id))?;

    let rows = conn.equality_select(
        collection::STRUCTURE_VERSION_ATTRIBUTE,
        &[column::KEY, column::TYPE],
        &[Predicate::eq(
            column::STRUCTURE_VERSION_ID,
            structure_version_id.to_string(),
        )],
    )?;
    let mut attributes = BTreeMap::new();
    for row in &rows {
        attributes.insert(
            require_cell(row, column::KEY)?.to_string(),
            TagValueType::parse(require_cell(row, column::TYPE)?)?,
        );
    }
    Ok(attributes)
}

fn not_found_rewrite(id: VersionId) -> impl Fn(LodeError) -> LodeError {
    move |e| {
        if e.is_not_found() {
            LodeError::not_found(format!("structure version {}", id))
        } else {
            e
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lode_store::ColumnStore;

    fn factory() -> StructureFactory {
        StructureFactory::new(Arc::new(ColumnStore::new()), Arc::new(IdGenerator::new()))
    }

    fn person_attributes() -> BTreeMap<String, TagValueType> {
        let mut attributes = BTreeMap::new();
        attributes.insert("name".to_string(), TagValueType::String);
        attributes.insert("age".to_string(), TagValueType::Integer);
        attributes
    }

    #[test]
    fn create_then_retrieve() {
        let factory = factory();
        let created = factory.create("person", &BTreeMap::new()).unwrap();
        let read = factory.retrieve("person").unwrap();
        assert_eq!(read, created);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let factory = factory();
        factory.create("person", &BTreeMap::new()).unwrap();
        let err = factory.create("person", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, LodeError::DuplicateId(_)));
    }

    #[test]
    fn version_round_trips_attributes() {
        let factory = factory();
        let structure = factory.create("person", &BTreeMap::new()).unwrap();
        let version = factory
            .create_version(structure.id, &person_attributes(), &[])
            .unwrap();

        let read = factory.retrieve_version(version.id).unwrap();
        assert_eq!(read, version);
        assert_eq!(read.attributes, person_attributes());
    }

    #[test]
    fn leaves_track_the_version_chain() {
        let factory = factory();
        let structure = factory.create("person", &BTreeMap::new()).unwrap();
        let v1 = factory
            .create_version(structure.id, &person_attributes(), &[])
            .unwrap();
        let v2 = factory
            .create_version(structure.id, &person_attributes(), &[v1.id])
            .unwrap();

        assert_eq!(factory.leaves("person").unwrap(), vec![v2.id]);
    }

    #[test]
    fn missing_version_is_not_found() {
        let factory = factory();
        let err = factory.retrieve_version(VersionId(404)).unwrap_err();
        assert!(err.is_not_found());
    }
}
