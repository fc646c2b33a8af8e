//! Hard-link registry: alias names resolving to already-built nodes.

use crate::node::{GroupId, NodeId, Tree};

/// A registered alias. Once the tree is written out, `holder` exposes
/// `target` under `name`; the target keeps existing exactly once in
/// storage and the alias is a second path to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub holder: GroupId,
    pub name: String,
    pub target: NodeId,
}

impl Tree {
    /// Register a hard link from `holder` to `target`.
    ///
    /// Registration records the alias and nothing else. Links are resolved
    /// at the end of the write pass, after every primary node exists in the
    /// backend, so targets may be registered before their subtree is
    /// complete. A name clash with a primary child of `holder` only
    /// surfaces as a backend error during the write pass.
    pub fn link(&mut self, holder: GroupId, name: &str, target: impl Into<NodeId>) {
        self.links.push(Link {
            holder,
            name: name.to_string(),
            target: target.into(),
        });
    }

    /// Registered links in registration order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreOptions;
    use crate::value::DataValue;

    #[test]
    fn links_record_in_registration_order() {
        let mut tree = Tree::new("entry", &[]);
        let root = tree.root();
        let detector = tree.group(root, "detector", &[]);
        let data_group = tree.group(root, "data", &[]);
        let frames = tree.dataset(detector, "data", DataValue::I64(0), &[], StoreOptions::default());

        tree.link(data_group, "data", frames);
        tree.link(root, "detector_alias", detector);

        assert_eq!(tree.links().len(), 2);
        assert_eq!(tree.links()[0].name, "data");
        assert_eq!(tree.links()[0].target, NodeId::Dataset(frames));
        assert_eq!(tree.links()[1].target, NodeId::Group(detector));
    }
}
