//! End-to-end write-then-inspect tests against the in-memory backend.

use rustynexus_store::MemStore;
use rustynexus_tree::{
    write_tree, AttrValue, DataValue, ElementType, NdArray, ObjectStore, StoreError, StoreOptions, Tree,
};

fn written(tree: &Tree) -> MemStore {
    let mut store = MemStore::new();
    write_tree(tree, &mut store).expect("write pass failed");
    store
}

#[test]
fn minimal_entry_round_trips() {
    let mut tree = Tree::new("entry", &[("NX_class", "NXentry".into())]);
    let root = tree.root();
    let instrument = tree.group(root, "instrument", &[("NX_class", "NXinstrument".into())]);
    tree.dataset(
        instrument,
        "two_theta",
        DataValue::F64(0.0),
        &[("units", "degrees".into())],
        StoreOptions::default(),
    );

    let store = written(&tree);

    let entry = store.resolve("entry").expect("entry missing");
    assert!(store.is_group(entry));
    assert_eq!(store.attr(entry, "NX_class"), Some(&AttrValue::String("NXentry".into())));

    let two_theta = store.resolve("entry/instrument/two_theta").expect("two_theta missing");
    assert_eq!(store.dataset_shape(two_theta), Some(&[][..]));
    assert_eq!(store.dataset_elem(two_theta), Some(ElementType::F64));
    assert_eq!(store.read_f64(two_theta), Some(vec![0.0]));
    assert_eq!(store.attr(two_theta, "units"), Some(&AttrValue::String("degrees".into())));
}

#[test]
fn chunked_zero_array_keeps_shape_options_and_payload() {
    let mut tree = Tree::new("entry", &[]);
    let root = tree.root();
    let detector = tree.group(root, "detector", &[]);
    tree.dataset(
        detector,
        "data",
        NdArray::zeros(&[16, 16, 16], ElementType::I64).into(),
        &[],
        StoreOptions::chunked(&[1, 16, 16]).with_deflate(9),
    );

    let store = written(&tree);
    let data = store.resolve("entry/detector/data").expect("data missing");

    assert_eq!(store.dataset_shape(data), Some(&[16, 16, 16][..]));
    let options = store.dataset_options(data).unwrap();
    assert_eq!(options.chunk_dims.as_deref(), Some(&[1, 16, 16][..]));
    assert_eq!(options.deflate_level, Some(9));

    let values = store.read_i64(data).expect("payload is not i64");
    assert_eq!(values.len(), 16 * 16 * 16);
    assert!(values.iter().all(|&v| v == 0));
}

#[test]
fn hard_link_aliases_one_physical_object() {
    let mut tree = Tree::new("entry", &[]);
    let root = tree.root();
    let instrument = tree.group(root, "instrument", &[]);
    let detector = tree.group(instrument, "detector", &[]);
    let frames = tree.dataset(
        detector,
        "data",
        DataValue::I64Seq(vec![7, 8, 9]),
        &[],
        StoreOptions::default(),
    );
    let data_group = tree.group(root, "data", &[("NX_class", "NXdata".into())]);
    tree.link(data_group, "data", frames);

    let store = written(&tree);

    let primary = store.resolve("entry/instrument/detector/data").expect("primary path missing");
    let alias = store.resolve("entry/data/data").expect("alias path missing");
    assert_eq!(primary, alias);
    assert_eq!(store.read_i64(alias), Some(vec![7, 8, 9]));
    // Three groups under entry's subtree plus root container and one dataset.
    assert_eq!(store.object_count(), 6);
}

#[test]
fn group_link_aliases_a_whole_subtree() {
    let mut tree = Tree::new("entry", &[]);
    let root = tree.root();
    let instrument = tree.group(root, "instrument", &[]);
    let detector = tree.group(instrument, "detector", &[]);
    tree.dataset(detector, "count_time", DataValue::F64(0.01), &[], StoreOptions::default());
    tree.link(root, "detector", detector);

    let store = written(&tree);
    assert_eq!(
        store.resolve("entry/detector/count_time"),
        store.resolve("entry/instrument/detector/count_time"),
    );
}

#[test]
fn same_name_group_and_dataset_collide_at_write_time() {
    let mut tree = Tree::new("entry", &[]);
    let root = tree.root();
    // Legal in the model: separate namespaces until a backend sees them.
    tree.group(root, "data", &[]);
    tree.dataset(root, "data", DataValue::I64(1), &[], StoreOptions::default());

    let mut store = MemStore::new();
    let err = write_tree(&tree, &mut store).unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { name, .. } if name == "data"));
}

#[test]
fn repeat_get_or_create_drops_attrs_in_the_written_container() {
    let mut tree = Tree::new("entry", &[]);
    let root = tree.root();
    tree.group(root, "instrument", &[("NX_class", "NXinstrument".into())]);
    // Re-entering the same group: these attributes must not appear.
    tree.group(root, "instrument", &[("stray", "value".into())]);

    let store = written(&tree);
    let instrument = store.resolve("entry/instrument").unwrap();
    assert_eq!(store.attr(instrument, "NX_class"), Some(&AttrValue::String("NXinstrument".into())));
    assert_eq!(store.attr(instrument, "stray"), None);
}

#[test]
fn numeric_and_text_payloads_are_exact() {
    let mut tree = Tree::new("entry", &[]);
    let root = tree.root();
    tree.dataset(
        root,
        "angles",
        DataValue::F64Seq(vec![std::f64::consts::PI, -0.0, 1.0e-300]),
        &[],
        StoreOptions::default(),
    );
    tree.dataset(root, "material", DataValue::from("silicon"), &[], StoreOptions::default());

    let store = written(&tree);
    let angles = store.resolve("entry/angles").unwrap();
    let values = store.read_f64(angles).unwrap();
    assert_eq!(values[0].to_bits(), std::f64::consts::PI.to_bits());
    assert_eq!(values[1].to_bits(), (-0.0f64).to_bits());
    assert_eq!(values[2].to_bits(), 1.0e-300f64.to_bits());

    let material = store.resolve("entry/material").unwrap();
    assert_eq!(store.dataset_elem(material), Some(ElementType::Str(7)));
    assert_eq!(store.read_str(material), Some("silicon".into()));
}

#[test]
fn store_stays_open_after_a_pass_until_closed() {
    let mut tree = Tree::new("entry", &[]);
    let root = tree.root();
    tree.dataset(root, "x", DataValue::I64(1), &[], StoreOptions::default());

    let mut store = MemStore::new();
    write_tree(&tree, &mut store).unwrap();
    assert!(!store.is_closed());

    store.close().unwrap();
    assert!(store.is_closed());
    let err = write_tree(&tree, &mut store).unwrap_err();
    assert!(matches!(err, StoreError::Closed));
}
