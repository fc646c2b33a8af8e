//! The in-memory node model: an arena-owned tree of named groups and
//! datasets.
//!
//! Nodes live in [`Tree`]-owned vectors and refer to each other by index
//! ids, so parent references stay cheap copies and the ownership graph
//! stays a strict tree. Ids are only meaningful for the tree that issued
//! them.

use indexmap::IndexMap;

use crate::link::Link;
use crate::store::StoreOptions;
use crate::value::{AttrValue, DataValue};

/// Identifies a group within its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub(crate) usize);

/// Identifies a dataset within its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetId(pub(crate) usize);

/// Either kind of node: what links point at and paths are computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Group(GroupId),
    Dataset(DatasetId),
}

impl From<GroupId> for NodeId {
    fn from(id: GroupId) -> NodeId {
        NodeId::Group(id)
    }
}

impl From<DatasetId> for NodeId {
    fn from(id: DatasetId) -> NodeId {
        NodeId::Dataset(id)
    }
}

/// A named container node holding attributes, child groups and datasets.
///
/// Child groups and child datasets are separate namespaces: a group may
/// hold a child group and a dataset with the same name. Storage backends
/// usually collapse the two into one namespace, so such a pair only
/// surfaces as a conflict when the tree is written out.
#[derive(Debug)]
pub struct GroupNode {
    pub(crate) name: String,
    pub(crate) attrs: IndexMap<String, AttrValue>,
    pub(crate) children: IndexMap<String, GroupId>,
    pub(crate) datasets: IndexMap<String, DatasetId>,
    pub(crate) parent: Option<GroupId>,
}

impl GroupNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attrs(&self) -> &IndexMap<String, AttrValue> {
        &self.attrs
    }

    /// Child group ids in creation order.
    pub fn child_groups(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.children.values().copied()
    }

    /// Child dataset ids in creation order.
    pub fn child_datasets(&self) -> impl Iterator<Item = DatasetId> + '_ {
        self.datasets.values().copied()
    }

    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }
}

/// A named leaf node holding one value, attributes and creation hints.
#[derive(Debug)]
pub struct DatasetNode {
    pub(crate) name: String,
    pub(crate) value: DataValue,
    pub(crate) attrs: IndexMap<String, AttrValue>,
    pub(crate) options: StoreOptions,
    pub(crate) parent: GroupId,
}

impl DatasetNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &DataValue {
        &self.value
    }

    pub fn attrs(&self) -> &IndexMap<String, AttrValue> {
        &self.attrs
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn parent(&self) -> GroupId {
        self.parent
    }
}

/// An arena-owned tree of groups and datasets plus registered hard links.
///
/// Construction is get-or-create and never fails. Asking for a child that
/// already exists returns the existing node unchanged; the attributes
/// (and, for datasets, value and options) supplied with the repeat call
/// are dropped, not merged. Callers rely on that to re-enter a subtree
/// while wiring cross-references.
#[derive(Debug)]
pub struct Tree {
    pub(crate) groups: Vec<GroupNode>,
    pub(crate) datasets: Vec<DatasetNode>,
    pub(crate) links: Vec<Link>,
    root: GroupId,
}

impl Tree {
    /// Tree whose root group has the given name and attributes.
    pub fn new(name: &str, attrs: &[(&str, AttrValue)]) -> Tree {
        let root = GroupNode {
            name: name.to_string(),
            attrs: attr_map(attrs),
            children: IndexMap::new(),
            datasets: IndexMap::new(),
            parent: None,
        };
        Tree {
            groups: vec![root],
            datasets: Vec::new(),
            links: Vec::new(),
            root: GroupId(0),
        }
    }

    pub fn root(&self) -> GroupId {
        self.root
    }

    /// Get or create the child group `name` under `parent`.
    ///
    /// When the child already exists it is returned as-is and `attrs` are
    /// discarded.
    pub fn group(&mut self, parent: GroupId, name: &str, attrs: &[(&str, AttrValue)]) -> GroupId {
        if let Some(&existing) = self.groups[parent.0].children.get(name) {
            return existing;
        }
        let id = GroupId(self.groups.len());
        self.groups.push(GroupNode {
            name: name.to_string(),
            attrs: attr_map(attrs),
            children: IndexMap::new(),
            datasets: IndexMap::new(),
            parent: Some(parent),
        });
        self.groups[parent.0].children.insert(name.to_string(), id);
        id
    }

    /// Get or create the dataset `name` under `parent`.
    ///
    /// When the dataset already exists it is returned as-is and `value`,
    /// `attrs` and `options` are all discarded.
    pub fn dataset(
        &mut self,
        parent: GroupId,
        name: &str,
        value: DataValue,
        attrs: &[(&str, AttrValue)],
        options: StoreOptions,
    ) -> DatasetId {
        if let Some(&existing) = self.groups[parent.0].datasets.get(name) {
            return existing;
        }
        let id = DatasetId(self.datasets.len());
        self.datasets.push(DatasetNode {
            name: name.to_string(),
            value,
            attrs: attr_map(attrs),
            options,
            parent,
        });
        self.groups[parent.0].datasets.insert(name.to_string(), id);
        id
    }

    /// Attach or replace one attribute on a group.
    pub fn set_group_attr(&mut self, id: GroupId, name: &str, value: AttrValue) {
        self.groups[id.0].attrs.insert(name.to_string(), value);
    }

    /// Attach or replace one attribute on a dataset.
    pub fn set_dataset_attr(&mut self, id: DatasetId, name: &str, value: AttrValue) {
        self.datasets[id.0].attrs.insert(name.to_string(), value);
    }

    pub fn group_node(&self, id: GroupId) -> &GroupNode {
        &self.groups[id.0]
    }

    pub fn dataset_node(&self, id: DatasetId) -> &DatasetNode {
        &self.datasets[id.0]
    }

    /// Look up an existing child group without creating it.
    pub fn find_group(&self, parent: GroupId, name: &str) -> Option<GroupId> {
        self.groups[parent.0].children.get(name).copied()
    }

    /// Look up an existing dataset without creating it.
    pub fn find_dataset(&self, parent: GroupId, name: &str) -> Option<DatasetId> {
        self.groups[parent.0].datasets.get(name).copied()
    }

    pub fn dataset_value(&self, id: DatasetId) -> &DataValue {
        &self.datasets[id.0].value
    }

    /// Mutable access to a dataset's value.
    ///
    /// Storage shape and payload are derived from the value as it is when
    /// the write pass runs, so edits made here are what gets stored.
    pub fn dataset_value_mut(&mut self, id: DatasetId) -> &mut DataValue {
        &mut self.datasets[id.0].value
    }

    /// Slash-separated absolute path of a node.
    ///
    /// A node's path is its parent's path plus its own name; the root
    /// group's path is its bare name with no leading slash. Paths are
    /// recomputed from current parentage on every call.
    pub fn path(&self, node: NodeId) -> String {
        match node {
            NodeId::Group(id) => self.group_path(id),
            NodeId::Dataset(id) => self.dataset_path(id),
        }
    }

    pub fn group_path(&self, id: GroupId) -> String {
        let node = &self.groups[id.0];
        match node.parent {
            Some(parent) => format!("{}/{}", self.group_path(parent), node.name),
            None => node.name.clone(),
        }
    }

    pub fn dataset_path(&self, id: DatasetId) -> String {
        let node = &self.datasets[id.0];
        format!("{}/{}", self.group_path(node.parent), node.name)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn dataset_count(&self) -> usize {
        self.datasets.len()
    }
}

fn attr_map(attrs: &[(&str, AttrValue)]) -> IndexMap<String, AttrValue> {
    attrs.iter().map(|(name, value)| (name.to_string(), value.clone())).collect()
}
