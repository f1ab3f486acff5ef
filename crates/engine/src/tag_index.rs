//! Tag storage and reverse lookup.
//!
//! Items and versions carry independent tag namespaces; both persist as one
//! row per tag `(owner, key, value, type)` and support the reverse question
//! "which owners carry key K". The reverse lookup pushes an equality
//! predicate on the `key` column down to the backend so it stays
//! O(matches).

use std::collections::BTreeMap;

use lode_core::schema::{collection, column};
use lode_core::{decode, encode, LodeResult, Tag, TagValueType};
use lode_store::{cell, require_cell, require_u64, Connection, Predicate, Row, RowBuilder};

/// Which tag namespace a call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagNamespace {
    Item,
    Version,
}

impl TagNamespace {
    fn collection(self) -> &'static str {
        match self {
            TagNamespace::Item => collection::ITEM_TAG,
            TagNamespace::Version => collection::VERSION_TAG,
        }
    }

    fn owner_column(self) -> &'static str {
        match self {
            TagNamespace::Item => column::ITEM_ID,
            TagNamespace::Version => column::VERSION_ID,
        }
    }
}

/// Tag reads and writes, parameterized by namespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagIndex;

impl TagIndex {
    /// Write one row per tag within the current transaction.
    pub fn put_tags(
        &self,
        conn: &mut dyn Connection,
        namespace: TagNamespace,
        owner: u64,
        tags: &BTreeMap<String, Tag>,
    ) -> LodeResult<()> {
        for tag in tags.values() {
            let row = RowBuilder::new()
                .set(namespace.owner_column(), owner.to_string())
                .set(column::KEY, tag.key.clone())
                .set_opt(column::VALUE, tag.value.as_ref().map(encode))
                .set_opt(
                    column::TYPE,
                    tag.value_type().map(|t| t.as_str().to_string()),
                )
                .build();
            conn.insert(namespace.collection(), row)?;
        }
        Ok(())
    }

    /// All tags of one owner; empty map (never an error) when it has none.
    pub fn get_tags(
        &self,
        conn: &mut dyn Connection,
        namespace: TagNamespace,
        owner: u64,
    ) -> LodeResult<BTreeMap<String, Tag>> {
        let rows = conn.equality_select(
            namespace.collection(),
            &[],
            &[Predicate::eq(namespace.owner_column(), owner.to_string())],
        )?;

        let mut tags = BTreeMap::new();
        for row in rows {
            let tag = decode_tag(&row, owner)?;
            tags.insert(tag.key.clone(), tag);
        }
        Ok(tags)
    }

    /// Reverse lookup: owner ids carrying the given tag key.
    pub fn find_owners_by_tag_key(
        &self,
        conn: &mut dyn Connection,
        namespace: TagNamespace,
        key: &str,
    ) -> LodeResult<Vec<u64>> {
        let owner_column = namespace.owner_column();
        let rows = conn.equality_select(
            namespace.collection(),
            &[owner_column],
            &[Predicate::eq(column::KEY, key)],
        )?;

        let mut owners = Vec::with_capacity(rows.len());
        for row in &rows {
            owners.push(require_u64(row, owner_column)?);
        }
        owners.sort_unstable();
        owners.dedup();
        Ok(owners)
    }
}

fn decode_tag(row: &Row, owner: u64) -> LodeResult<Tag> {
    let key = require_cell(row, column::KEY)?.to_string();
    let ty = match cell(row, column::TYPE) {
        Some(literal) => Some(TagValueType::parse(literal)?),
        None => None,
    };
    let value = decode(cell(row, column::VALUE), ty)?;
    Ok(Tag::new(owner, key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lode_core::TagValue;
    use lode_store::{Backend, ColumnStore};

    fn tag_map(owner: u64, entries: &[(&str, Option<TagValue>)]) -> BTreeMap<String, Tag> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Tag::new(owner, *k, v.clone())))
            .collect()
    }

    #[test]
    fn put_then_get_round_trips_typed_values() {
        let store = ColumnStore::new();
        let index = TagIndex;

        let tags = tag_map(
            1,
            &[
                ("status", Some(TagValue::String("live".into()))),
                ("retries", Some(TagValue::Integer(3))),
                ("pinned", None),
            ],
        );

        let mut conn = store.connect().unwrap();
        index
            .put_tags(conn.as_mut(), TagNamespace::Item, 1, &tags)
            .unwrap();
        conn.commit().unwrap();

        let mut conn = store.connect().unwrap();
        let read = index
            .get_tags(conn.as_mut(), TagNamespace::Item, 1)
            .unwrap();
        conn.abort().unwrap();

        assert_eq!(read, tags);
    }

    #[test]
    fn get_tags_for_untagged_owner_is_empty_map() {
        let store = ColumnStore::new();
        let mut conn = store.connect().unwrap();
        let read = TagIndex
            .get_tags(conn.as_mut(), TagNamespace::Version, 404)
            .unwrap();
        conn.abort().unwrap();
        assert!(read.is_empty());
    }

    #[test]
    fn reverse_lookup_returns_exactly_the_tagged_owners() {
        let store = ColumnStore::new();
        let index = TagIndex;

        let mut conn = store.connect().unwrap();
        for owner in [1u64, 3] {
            index
                .put_tags(
                    conn.as_mut(),
                    TagNamespace::Item,
                    owner,
                    &tag_map(owner, &[("status", None)]),
                )
                .unwrap();
        }
        index
            .put_tags(
                conn.as_mut(),
                TagNamespace::Item,
                2,
                &tag_map(2, &[("owner", None)]),
            )
            .unwrap();
        conn.commit().unwrap();

        let mut conn = store.connect().unwrap();
        let owners = index
            .find_owners_by_tag_key(conn.as_mut(), TagNamespace::Item, "status")
            .unwrap();
        assert_eq!(owners, vec![1, 3]);

        let none = index
            .find_owners_by_tag_key(conn.as_mut(), TagNamespace::Item, "missing")
            .unwrap();
        assert!(none.is_empty());
        conn.abort().unwrap();
    }

    #[test]
    fn namespaces_do_not_mix() {
        let store = ColumnStore::new();
        let index = TagIndex;

        let mut conn = store.connect().unwrap();
        index
            .put_tags(
                conn.as_mut(),
                TagNamespace::Item,
                7,
                &tag_map(7, &[("shared", None)]),
            )
            .unwrap();
        conn.commit().unwrap();

        let mut conn = store.connect().unwrap();
        let versions = index
            .find_owners_by_tag_key(conn.as_mut(), TagNamespace::Version, "shared")
            .unwrap();
        assert!(versions.is_empty());
        conn.abort().unwrap();
    }
}
