//! Shared item-level plumbing for the entity factories.
//!
//! Every entity kind stores one `(item_id, name)` row in its own collection
//! next to the generic item row; names are unique per kind.

use std::collections::BTreeMap;

use lode_core::schema::column;
use lode_core::tag::tags_for_owner;
use lode_core::{IdGenerator, ItemId, LodeError, LodeResult, Tag, TagValue};
use lode_engine::{ItemEngine, TagIndex, TagNamespace};
use lode_store::{require_u64, Connection, Predicate, RowBuilder};

#[derive(Debug, Clone, Copy)]
pub(crate) struct EntityBase {
    /// Entity collection name (`graph`, `node`, ...).
    pub collection: &'static str,
    /// Human-readable kind for error messages.
    pub kind: &'static str,
    pub engine: ItemEngine,
    pub tags: TagIndex,
}

impl EntityBase {
    pub(crate) fn new(collection: &'static str, kind: &'static str) -> Self {
        EntityBase {
            collection,
            kind,
            engine: ItemEngine::new(),
            tags: TagIndex,
        }
    }

    /// Insert the item row, its tags, and the named entity row.
    pub(crate) fn create_item(
        &self,
        conn: &mut dyn Connection,
        ids: &IdGenerator,
        name: &str,
        tag_values: &BTreeMap<String, Option<TagValue>>,
    ) -> LodeResult<(ItemId, BTreeMap<String, Tag>)> {
        let taken = conn.equality_select(
            self.collection,
            &[column::ITEM_ID],
            &[Predicate::eq(column::NAME, name)],
        )?;
        if !taken.is_empty() {
            return Err(LodeError::duplicate_id(format!(
                "{} named '{}'",
                self.kind, name
            )));
        }

        let id = ids.next_item_id();
        let tags = tags_for_owner(id.as_u64(), tag_values);
        self.engine.insert_item(conn, id, &tags)?;
        conn.insert(
            self.collection,
            RowBuilder::new()
                .set(column::ITEM_ID, id.to_string())
                .set(column::NAME, name)
                .build(),
        )?;
        Ok((id, tags))
    }

    /// Look the entity up by name; `NotFound` when absent.
    pub(crate) fn retrieve_item(
        &self,
        conn: &mut dyn Connection,
        name: &str,
    ) -> LodeResult<(ItemId, BTreeMap<String, Tag>)> {
        let row = conn
            .get_vertex(self.collection, &[Predicate::eq(column::NAME, name)])
            .map_err(|e| {
                if e.is_not_found() {
                    LodeError::not_found(format!("{} named '{}'", self.kind, name))
                } else {
                    e
                }
            })?;
        let id = ItemId(require_u64(&row, column::ITEM_ID)?);
        let tags = self
            .tags
            .get_tags(conn, TagNamespace::Item, id.as_u64())?;
        Ok((id, tags))
    }
}
