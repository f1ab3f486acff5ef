//! End-to-end catalog behavior, run against every storage engine.
//!
//! Each test drives the public `Catalog` surface and, where the observable
//! behavior is about persisted rows, inspects the backend directly through a
//! raw connection.

use std::collections::BTreeMap;
use std::sync::Arc;

use lodedb::schema::{collection, column};
use lodedb::{
    Backend, Catalog, ColumnStore, LodeError, Predicate, PropertyGraphStore, RichVersionArgs,
    TagValue, TagValueType, TraversalGraphStore, VersionId,
};

fn backends() -> Vec<Arc<dyn Backend>> {
    vec![
        Arc::new(ColumnStore::new()),
        Arc::new(PropertyGraphStore::new()),
        Arc::new(TraversalGraphStore::new()),
    ]
}

fn for_each_backend(test: impl Fn(&Catalog, &Arc<dyn Backend>)) {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();
    for backend in backends() {
        let catalog = Catalog::with_backend(backend.clone());
        test(&catalog, &backend);
    }
}

fn no_tags() -> BTreeMap<String, Option<TagValue>> {
    BTreeMap::new()
}

/// Count committed rows of one collection matching the predicates.
fn count_rows(backend: &Arc<dyn Backend>, coll: &str, predicates: &[Predicate]) -> usize {
    let mut conn = backend.connect().unwrap();
    let rows = conn.equality_select(coll, &[], predicates).unwrap();
    conn.abort().unwrap();
    rows.len()
}

#[test]
fn leaves_are_exactly_the_parentless_versions() {
    for_each_backend(|catalog, backend| {
        let nodes = catalog.nodes();
        let node = nodes.create("metrics", &no_tags()).unwrap();

        // diamond: v1 -> {v2, v3} -> v4, then a dangling v5 off v2
        let v1 = nodes
            .create_version(node.id, &RichVersionArgs::default(), &[])
            .unwrap()
            .rich
            .id;
        let v2 = nodes
            .create_version(node.id, &RichVersionArgs::default(), &[v1])
            .unwrap()
            .rich
            .id;
        let v3 = nodes
            .create_version(node.id, &RichVersionArgs::default(), &[v1])
            .unwrap()
            .rich
            .id;
        let v4 = nodes
            .create_version(node.id, &RichVersionArgs::default(), &[v2, v3])
            .unwrap()
            .rich
            .id;
        let v5 = nodes
            .create_version(node.id, &RichVersionArgs::default(), &[v2])
            .unwrap()
            .rich
            .id;

        let mut expected = vec![v4, v5];
        expected.sort_unstable();
        assert_eq!(
            nodes.leaves("metrics").unwrap(),
            expected,
            "backend {}",
            backend.name()
        );
    });
}

#[test]
fn empty_parent_list_appends_under_every_leaf() {
    for_each_backend(|catalog, backend| {
        let nodes = catalog.nodes();
        let node = nodes.create("metrics", &no_tags()).unwrap();

        let v1 = nodes
            .create_version(node.id, &RichVersionArgs::default(), &[])
            .unwrap()
            .rich
            .id;
        let l1 = nodes
            .create_version(node.id, &RichVersionArgs::default(), &[v1])
            .unwrap()
            .rich
            .id;
        let l2 = nodes
            .create_version(node.id, &RichVersionArgs::default(), &[v1])
            .unwrap()
            .rich
            .id;
        assert_eq!(nodes.leaves("metrics").unwrap(), vec![l1, l2]);

        let v = nodes
            .create_version(node.id, &RichVersionArgs::default(), &[])
            .unwrap()
            .rich
            .id;

        assert_eq!(
            nodes.leaves("metrics").unwrap(),
            vec![v],
            "backend {}",
            backend.name()
        );
        for parent in [l1, l2] {
            assert_eq!(
                count_rows(
                    backend,
                    collection::VERSION_PARENT,
                    &[
                        Predicate::eq(column::CHILD_ID, v.to_string()),
                        Predicate::eq(column::PARENT_ID, parent.to_string()),
                    ],
                ),
                1,
                "backend {}",
                backend.name()
            );
        }
    });
}

#[test]
fn foreign_parent_is_rejected_and_frontier_survives() {
    for_each_backend(|catalog, backend| {
        let nodes = catalog.nodes();
        let mine = nodes.create("mine", &no_tags()).unwrap();
        let other = nodes.create("other", &no_tags()).unwrap();

        let my_v = nodes
            .create_version(mine.id, &RichVersionArgs::default(), &[])
            .unwrap()
            .rich
            .id;
        let foreign_v = nodes
            .create_version(other.id, &RichVersionArgs::default(), &[])
            .unwrap()
            .rich
            .id;

        let before = nodes.leaves("mine").unwrap();
        let err = nodes
            .create_version(mine.id, &RichVersionArgs::default(), &[foreign_v])
            .unwrap_err();
        assert!(
            matches!(err, LodeError::InvalidParent(_)),
            "backend {}",
            backend.name()
        );
        assert_eq!(nodes.leaves("mine").unwrap(), before);
        assert_eq!(before, vec![my_v]);
    });
}

#[test]
fn reverse_tag_lookup_returns_exactly_the_tagged_items() {
    for_each_backend(|catalog, backend| {
        let mut status = BTreeMap::new();
        status.insert(
            "status".to_string(),
            Some(TagValue::String("active".into())),
        );

        let a = catalog.nodes().create("a", &status).unwrap();
        catalog.nodes().create("b", &no_tags()).unwrap();
        let c = catalog.graphs().create("c", &status).unwrap();

        let mut expected = vec![a.id, c.id];
        expected.sort_unstable();
        assert_eq!(
            catalog.item_ids_by_tag_key("status").unwrap(),
            expected,
            "backend {}",
            backend.name()
        );
        assert!(catalog.item_ids_by_tag_key("missing").unwrap().is_empty());
    });
}

#[test]
fn structure_conformance_accepts_and_rejects() {
    for_each_backend(|catalog, backend| {
        let structures = catalog.structures();
        let person = structures.create("person", &no_tags()).unwrap();
        let mut attributes = BTreeMap::new();
        attributes.insert("name".to_string(), TagValueType::String);
        attributes.insert("age".to_string(), TagValueType::Integer);
        let sv = structures
            .create_version(person.id, &attributes, &[])
            .unwrap();

        let people = catalog.nodes().create("people", &no_tags()).unwrap();

        let mut alice = RichVersionArgs::default();
        alice.structure_version_id = Some(sv.id);
        alice
            .tags
            .insert("name".to_string(), Some(TagValue::String("Alice".into())));
        alice
            .tags
            .insert("age".to_string(), Some(TagValue::Integer(30)));
        let accepted = catalog.nodes().create_version(people.id, &alice, &[]).unwrap();
        assert_eq!(accepted.rich.structure_version_id, Some(sv.id));

        let mut bad = alice.clone();
        bad.tags
            .insert("age".to_string(), Some(TagValue::String("thirty".into())));
        let err = catalog
            .nodes()
            .create_version(people.id, &bad, &[accepted.rich.id])
            .unwrap_err();
        assert!(
            matches!(err, LodeError::StructureConformance(_)),
            "backend {}",
            backend.name()
        );
        assert_eq!(
            catalog.nodes().leaves("people").unwrap(),
            vec![accepted.rich.id]
        );
    });
}

#[test]
fn failed_operation_persists_nothing() {
    for_each_backend(|catalog, backend| {
        let node = catalog.nodes().create("events", &no_tags()).unwrap();

        let mut args = RichVersionArgs::default();
        args.structure_version_id = Some(VersionId(9999));
        args.tags
            .insert("orphan".to_string(), Some(TagValue::Boolean(true)));
        args.reference = Some("hdfs://nowhere".to_string());
        let err = catalog
            .nodes()
            .create_version(node.id, &args, &[])
            .unwrap_err();
        assert!(err.is_not_found(), "backend {}", backend.name());

        assert!(catalog.nodes().leaves("events").unwrap().is_empty());
        assert!(catalog.version_ids_by_tag_key("orphan").unwrap().is_empty());
        // no other test data in this store; every version collection is empty
        for coll in [
            collection::VERSION,
            collection::VERSION_TAG,
            collection::RICH_VERSION,
            collection::NODE_VERSION,
        ] {
            assert_eq!(
                count_rows(backend, coll, &[]),
                0,
                "backend {} collection {}",
                backend.name(),
                coll
            );
        }
    });
}

#[test]
fn edges_graphs_and_lineage_compose() {
    for_each_backend(|catalog, backend| {
        let users = catalog.nodes().create("users", &no_tags()).unwrap();
        let orders = catalog.nodes().create("orders", &no_tags()).unwrap();
        let users_v = catalog
            .nodes()
            .create_version(users.id, &RichVersionArgs::default(), &[])
            .unwrap();
        let orders_v = catalog
            .nodes()
            .create_version(orders.id, &RichVersionArgs::default(), &[])
            .unwrap();

        let placed = catalog.edges().create("placed", &no_tags()).unwrap();
        let placed_v = catalog
            .edges()
            .create_version(
                placed.id,
                users_v.rich.id,
                orders_v.rich.id,
                &RichVersionArgs::default(),
                &[],
            )
            .unwrap();

        let commerce = catalog.graphs().create("commerce", &no_tags()).unwrap();
        let commerce_v = catalog
            .graphs()
            .create_version(
                commerce.id,
                &[placed_v.rich.id],
                &RichVersionArgs::default(),
                &[],
            )
            .unwrap();
        let read = catalog.graphs().retrieve_version(commerce_v.rich.id).unwrap();
        assert_eq!(read.edge_version_ids, vec![placed_v.rich.id]);

        let json = serde_json::to_string(&read).unwrap();
        let back: lodedb::GraphVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, read);

        let derivation = catalog
            .lineage_edges()
            .create("user-to-order", &no_tags())
            .unwrap();
        let derivation_v = catalog
            .lineage_edges()
            .create_version(
                derivation.id,
                users_v.rich.id,
                orders_v.rich.id,
                &RichVersionArgs::default(),
                &[],
            )
            .unwrap();
        let read = catalog
            .lineage_edges()
            .retrieve_version(derivation_v.rich.id)
            .unwrap();
        assert_eq!(read.from_rich_version_id, users_v.rich.id);
        assert_eq!(read.to_rich_version_id, orders_v.rich.id);

        assert_eq!(
            catalog.lineage_edges().leaves("user-to-order").unwrap(),
            vec![derivation_v.rich.id],
            "backend {}",
            backend.name()
        );
    });
}

#[test]
fn retrieval_of_missing_entities_is_not_found() {
    for_each_backend(|catalog, backend| {
        assert!(
            catalog.nodes().retrieve("ghost").unwrap_err().is_not_found(),
            "backend {}",
            backend.name()
        );
        assert!(catalog
            .graphs()
            .retrieve_version(VersionId(404))
            .unwrap_err()
            .is_not_found());
        assert!(catalog
            .structures()
            .retrieve_version(VersionId(404))
            .unwrap_err()
            .is_not_found());
    });
}

#[test]
fn update_links_a_version_created_earlier() {
    for_each_backend(|catalog, backend| {
        let nodes = catalog.nodes();
        let node = nodes.create("metrics", &no_tags()).unwrap();
        let v1 = nodes
            .create_version(node.id, &RichVersionArgs::default(), &[])
            .unwrap()
            .rich
            .id;
        let v2 = nodes
            .create_version(node.id, &RichVersionArgs::default(), &[])
            .unwrap()
            .rich
            .id;

        // grow a second head off v1, then re-link v2 beneath it with update
        let v3 = nodes
            .create_version(node.id, &RichVersionArgs::default(), &[v1])
            .unwrap()
            .rich
            .id;
        assert_eq!(nodes.leaves("metrics").unwrap(), vec![v2, v3]);

        nodes.update(node.id, v2, &[v3]).unwrap();
        assert_eq!(
            nodes.leaves("metrics").unwrap(),
            vec![v2],
            "backend {}",
            backend.name()
        );
    });
}
