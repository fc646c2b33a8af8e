//! Single-pass materialization of a [`Tree`] into an [`ObjectStore`].

use crate::node::{DatasetId, GroupId, NodeId, Tree};
use crate::store::{ObjectId, ObjectStore, StoreError};
use crate::value::ValueKind;

/// Write `tree` into `store` in one top-down pass.
///
/// Every group is created before its contents, each group's attributes
/// land before its children, child groups are visited in creation order
/// ahead of the group's datasets, and registered hard links are resolved
/// last, once every primary node has a backend handle. The first backend
/// error aborts the pass; whatever was already created stays in place.
///
/// The store is left open so callers can run further passes or close it
/// when the container is complete.
pub fn write_tree(tree: &Tree, store: &mut dyn ObjectStore) -> Result<(), StoreError> {
    let mut handles = HandleTable {
        groups: vec![None; tree.group_count()],
        datasets: vec![None; tree.dataset_count()],
    };
    write_group(tree, tree.root(), store.root(), store, &mut handles)?;
    for link in tree.links() {
        let parent = handles.group(link.holder)?;
        let target = handles.node(link.target)?;
        store.create_link(parent, &link.name, target)?;
    }
    Ok(())
}

/// Backend handles issued so far, indexed by node id.
struct HandleTable {
    groups: Vec<Option<ObjectId>>,
    datasets: Vec<Option<ObjectId>>,
}

impl HandleTable {
    fn group(&self, id: GroupId) -> Result<ObjectId, StoreError> {
        self.groups[id.0].ok_or_else(|| StoreError::Backend(format!("group {} was never materialized", id.0)))
    }

    fn dataset(&self, id: DatasetId) -> Result<ObjectId, StoreError> {
        self.datasets[id.0].ok_or_else(|| StoreError::Backend(format!("dataset {} was never materialized", id.0)))
    }

    fn node(&self, id: NodeId) -> Result<ObjectId, StoreError> {
        match id {
            NodeId::Group(g) => self.group(g),
            NodeId::Dataset(d) => self.dataset(d),
        }
    }
}

fn write_group(
    tree: &Tree,
    id: GroupId,
    parent: ObjectId,
    store: &mut dyn ObjectStore,
    handles: &mut HandleTable,
) -> Result<(), StoreError> {
    let node = tree.group_node(id);
    let handle = store.create_group(parent, node.name())?;
    handles.groups[id.0] = Some(handle);
    for (name, value) in node.attrs() {
        store.set_attr(handle, name, value)?;
    }
    for child in node.child_groups() {
        write_group(tree, child, handle, store, handles)?;
    }
    for dataset in node.child_datasets() {
        write_dataset(tree, dataset, handle, store, handles)?;
    }
    Ok(())
}

fn write_dataset(
    tree: &Tree,
    id: DatasetId,
    parent: ObjectId,
    store: &mut dyn ObjectStore,
    handles: &mut HandleTable,
) -> Result<(), StoreError> {
    let node = tree.dataset_node(id);
    let value = node.value();
    // The element-type override applies to numeric scalars and sequences;
    // text and explicit arrays keep their own element type.
    let elem = match node.options().element_type {
        Some(elem) if !matches!(value.kind(), ValueKind::Text { .. } | ValueKind::Array { .. }) => elem,
        _ => value.element_type(),
    };
    let handle = store.create_dataset(parent, node.name(), &value.shape(), elem, node.options())?;
    handles.datasets[id.0] = Some(handle);
    store.write(handle, &value.raw_bytes(elem))?;
    for (name, attr) in node.attrs() {
        store.set_attr(handle, name, attr)?;
    }
    Ok(())
}
