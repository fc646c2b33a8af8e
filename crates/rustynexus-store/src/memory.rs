//! In-memory object store, with a read-back API for inspecting what a
//! write pass produced.

use indexmap::IndexMap;

use rustynexus_tree::{AttrValue, ElementType, ObjectId, ObjectStore, StoreError, StoreOptions};

#[derive(Debug)]
enum Object {
    Group(GroupObject),
    Dataset(DatasetObject),
}

#[derive(Debug, Default)]
struct GroupObject {
    members: IndexMap<String, ObjectId>,
    attrs: IndexMap<String, AttrValue>,
}

#[derive(Debug)]
struct DatasetObject {
    shape: Vec<u64>,
    elem: ElementType,
    options: StoreOptions,
    data: Vec<u8>,
    attrs: IndexMap<String, AttrValue>,
}

/// In-memory hierarchical container.
///
/// Each group keeps a single name table, so hard links are just further
/// names resolving to an existing object id, and a dataset and a group
/// cannot share a name under one parent.
#[derive(Debug)]
pub struct MemStore {
    objects: Vec<Object>,
    closed: bool,
}

impl Default for MemStore {
    fn default() -> MemStore {
        MemStore::new()
    }
}

impl MemStore {
    /// Empty container holding only the root group.
    pub fn new() -> MemStore {
        MemStore {
            objects: vec![Object::Group(GroupObject::default())],
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.0 as usize)
    }

    fn group_ref(&mut self, id: ObjectId) -> Result<&mut GroupObject, StoreError> {
        match self.objects.get_mut(id.0 as usize) {
            Some(Object::Group(g)) => Ok(g),
            Some(Object::Dataset(_)) => Err(StoreError::NotAGroup(id)),
            None => Err(StoreError::StaleHandle(id)),
        }
    }

    fn dataset_ref(&mut self, id: ObjectId) -> Result<&mut DatasetObject, StoreError> {
        match self.objects.get_mut(id.0 as usize) {
            Some(Object::Dataset(d)) => Ok(d),
            Some(Object::Group(_)) => Err(StoreError::NotADataset(id)),
            None => Err(StoreError::StaleHandle(id)),
        }
    }

    /// Insert `id` into `parent`'s name table. The membership insert runs
    /// before the object itself is allocated, so a name clash leaves no
    /// orphan behind.
    fn insert_member(&mut self, parent: ObjectId, name: &str, id: ObjectId) -> Result<(), StoreError> {
        let group = self.group_ref(parent)?;
        if group.members.contains_key(name) {
            return Err(StoreError::AlreadyExists { parent, name: name.to_string() });
        }
        group.members.insert(name.to_string(), id);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Read-back API
    // ---------------------------------------------------------------

    /// Resolve a slash-separated path from the container root.
    pub fn resolve(&self, path: &str) -> Option<ObjectId> {
        let mut current = ObjectId(0);
        for component in path.split('/').filter(|c| !c.is_empty()) {
            match self.object(current)? {
                Object::Group(g) => current = *g.members.get(component)?,
                Object::Dataset(_) => return None,
            }
        }
        Some(current)
    }

    pub fn is_group(&self, id: ObjectId) -> bool {
        matches!(self.object(id), Some(Object::Group(_)))
    }

    pub fn attrs(&self, id: ObjectId) -> Option<&IndexMap<String, AttrValue>> {
        match self.object(id)? {
            Object::Group(g) => Some(&g.attrs),
            Object::Dataset(d) => Some(&d.attrs),
        }
    }

    pub fn attr(&self, id: ObjectId, name: &str) -> Option<&AttrValue> {
        self.attrs(id)?.get(name)
    }

    /// Member names of a group in creation order.
    pub fn member_names(&self, id: ObjectId) -> Option<Vec<&str>> {
        match self.object(id)? {
            Object::Group(g) => Some(g.members.keys().map(String::as_str).collect()),
            Object::Dataset(_) => None,
        }
    }

    /// Member (name, target) pairs of a group in creation order.
    pub fn members(&self, id: ObjectId) -> Option<Vec<(&str, ObjectId)>> {
        match self.object(id)? {
            Object::Group(g) => Some(g.members.iter().map(|(n, &t)| (n.as_str(), t)).collect()),
            Object::Dataset(_) => None,
        }
    }

    pub fn dataset_shape(&self, id: ObjectId) -> Option<&[u64]> {
        match self.object(id)? {
            Object::Dataset(d) => Some(&d.shape),
            Object::Group(_) => None,
        }
    }

    pub fn dataset_elem(&self, id: ObjectId) -> Option<ElementType> {
        match self.object(id)? {
            Object::Dataset(d) => Some(d.elem),
            Object::Group(_) => None,
        }
    }

    pub fn dataset_options(&self, id: ObjectId) -> Option<&StoreOptions> {
        match self.object(id)? {
            Object::Dataset(d) => Some(&d.options),
            Object::Group(_) => None,
        }
    }

    pub fn dataset_bytes(&self, id: ObjectId) -> Option<&[u8]> {
        match self.object(id)? {
            Object::Dataset(d) => Some(&d.data),
            Object::Group(_) => None,
        }
    }

    /// Decode a dataset's payload as f64 values.
    pub fn read_f64(&self, id: ObjectId) -> Option<Vec<f64>> {
        let bytes = self.dataset_bytes(id)?;
        if self.dataset_elem(id)? != ElementType::F64 {
            return None;
        }
        Some(
            bytes
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        )
    }

    /// Decode a dataset's payload as i64 values.
    pub fn read_i64(&self, id: ObjectId) -> Option<Vec<i64>> {
        let bytes = self.dataset_bytes(id)?;
        if self.dataset_elem(id)? != ElementType::I64 {
            return None;
        }
        Some(
            bytes
                .chunks_exact(8)
                .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        )
    }

    /// Decode a dataset's payload as i32 values.
    pub fn read_i32(&self, id: ObjectId) -> Option<Vec<i32>> {
        let bytes = self.dataset_bytes(id)?;
        if self.dataset_elem(id)? != ElementType::I32 {
            return None;
        }
        Some(
            bytes
                .chunks_exact(4)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }

    /// Decode a fixed-length string dataset.
    pub fn read_str(&self, id: ObjectId) -> Option<String> {
        let bytes = self.dataset_bytes(id)?;
        match self.dataset_elem(id)? {
            ElementType::Str(_) => String::from_utf8(bytes.to_vec()).ok(),
            _ => None,
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl ObjectStore for MemStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn root(&self) -> ObjectId {
        ObjectId(0)
    }

    fn create_group(&mut self, parent: ObjectId, name: &str) -> Result<ObjectId, StoreError> {
        self.ensure_open()?;
        let id = ObjectId(self.objects.len() as u64);
        self.insert_member(parent, name, id)?;
        self.objects.push(Object::Group(GroupObject::default()));
        Ok(id)
    }

    fn set_attr(&mut self, handle: ObjectId, name: &str, value: &AttrValue) -> Result<(), StoreError> {
        self.ensure_open()?;
        let attrs = match self.objects.get_mut(handle.0 as usize) {
            Some(Object::Group(g)) => &mut g.attrs,
            Some(Object::Dataset(d)) => &mut d.attrs,
            None => return Err(StoreError::StaleHandle(handle)),
        };
        attrs.insert(name.to_string(), value.clone());
        Ok(())
    }

    fn create_dataset(
        &mut self,
        parent: ObjectId,
        name: &str,
        shape: &[u64],
        elem: ElementType,
        options: &StoreOptions,
    ) -> Result<ObjectId, StoreError> {
        self.ensure_open()?;
        let id = ObjectId(self.objects.len() as u64);
        self.insert_member(parent, name, id)?;
        self.objects.push(Object::Dataset(DatasetObject {
            shape: shape.to_vec(),
            elem,
            options: options.clone(),
            data: Vec::new(),
            attrs: IndexMap::new(),
        }));
        Ok(id)
    }

    fn write(&mut self, handle: ObjectId, data: &[u8]) -> Result<(), StoreError> {
        self.ensure_open()?;
        let dataset = self.dataset_ref(handle)?;
        dataset.data = data.to_vec();
        Ok(())
    }

    fn create_link(&mut self, parent: ObjectId, name: &str, target: ObjectId) -> Result<(), StoreError> {
        self.ensure_open()?;
        if self.object(target).is_none() {
            return Err(StoreError::StaleHandle(target));
        }
        self.insert_member(parent, name, target)
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_store_has_only_the_root_group() {
        let store = MemStore::new();
        assert_eq!(store.object_count(), 1);
        assert!(store.is_group(store.root()));
        assert_eq!(store.resolve(""), Some(store.root()));
    }

    #[test]
    fn members_share_one_namespace() {
        let mut store = MemStore::new();
        let root = store.root();
        store.create_group(root, "entry").unwrap();
        let err = store
            .create_dataset(root, "entry", &[], ElementType::F64, &StoreOptions::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { name, .. } if name == "entry"));
        // The failed create left no orphan object behind.
        assert_eq!(store.object_count(), 2);
    }

    #[test]
    fn link_is_a_second_name_for_the_same_object() {
        let mut store = MemStore::new();
        let root = store.root();
        let entry = store.create_group(root, "entry").unwrap();
        let ds = store
            .create_dataset(entry, "data", &[2], ElementType::I64, &StoreOptions::default())
            .unwrap();
        store.write(ds, &[1, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        store.create_link(root, "alias", ds).unwrap();

        assert_eq!(store.resolve("alias"), Some(ds));
        assert_eq!(store.resolve("entry/data"), Some(ds));
        assert_eq!(store.read_i64(ds), Some(vec![1, 2]));
    }

    #[test]
    fn stale_handles_are_rejected() {
        let mut store = MemStore::new();
        let err = store.write(ObjectId(42), &[]).unwrap_err();
        assert!(matches!(err, StoreError::StaleHandle(ObjectId(42))));

        let err = store.create_link(store.root(), "x", ObjectId(9)).unwrap_err();
        assert!(matches!(err, StoreError::StaleHandle(ObjectId(9))));
    }

    #[test]
    fn write_to_a_group_is_rejected() {
        let mut store = MemStore::new();
        let root = store.root();
        let g = store.create_group(root, "entry").unwrap();
        assert!(matches!(store.write(g, &[0]), Err(StoreError::NotADataset(_))));
    }

    #[test]
    fn closed_store_rejects_writes() {
        let mut store = MemStore::new();
        let root = store.root();
        store.close().unwrap();
        assert!(matches!(store.create_group(root, "late"), Err(StoreError::Closed)));
        assert!(store.is_closed());
    }

    #[test]
    fn resolve_walks_nested_groups() {
        let mut store = MemStore::new();
        let root = store.root();
        let entry = store.create_group(root, "entry").unwrap();
        let instrument = store.create_group(entry, "instrument").unwrap();
        assert_eq!(store.resolve("entry/instrument"), Some(instrument));
        assert_eq!(store.resolve("entry/missing"), None);
        assert_eq!(store.member_names(entry), Some(vec!["instrument"]));
    }
}
