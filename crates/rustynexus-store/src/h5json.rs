//! Single-file JSON container backend.
//!
//! The on-disk layout follows the h5json vocabulary (the JSON mapping of
//! HDF5 containers): groups hold `H5L_TYPE_HARD` link lists, dataspaces
//! are `H5S_SCALAR` or `H5S_SIMPLE`, and chunk/filter hints live under
//! `creationProperties`. Hard links fall out of the mapping for free,
//! since two link entries may carry the same object id. Payloads are
//! base64, optionally shuffled and deflate-compressed per the dataset's
//! creation hints.
//!
//! [`H5JsonStore`] stages writes in a [`MemStore`] and serializes the
//! whole container on [`close`](rustynexus_tree::ObjectStore::close);
//! [`H5JsonFile`] reads a finished container back.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use rustynexus_tree::{AttrValue, ElementType, ObjectId, ObjectStore, StoreError, StoreOptions};

use crate::memory::MemStore;

const API_VERSION: &str = "1.0.0";
const HARD_LINK: &str = "H5L_TYPE_HARD";
const SCALAR_SHAPE: &str = "H5S_SCALAR";
const SIMPLE_SHAPE: &str = "H5S_SIMPLE";
const CHUNKED_LAYOUT: &str = "H5D_CHUNKED";
const DEFLATE_FILTER: &str = "H5Z_FILTER_DEFLATE";
const SHUFFLE_FILTER: &str = "H5Z_FILTER_SHUFFLE";

// ---------------------------------------------------------------------
// Wire schema
// ---------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct WireContainer {
    #[serde(rename = "apiVersion")]
    api_version: String,
    root: String,
    groups: IndexMap<String, WireGroup>,
    datasets: IndexMap<String, WireDataset>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireGroup {
    links: Vec<WireLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attributes: Vec<WireAttr>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireLink {
    title: String,
    class: String,
    id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireDataset {
    shape: WireShape,
    #[serde(rename = "type")]
    dtype: String,
    #[serde(rename = "creationProperties", default, skip_serializing_if = "Option::is_none")]
    creation: Option<WireCreation>,
    /// Base64 payload, filtered per `creationProperties`.
    #[serde(default)]
    value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    attributes: Vec<WireAttr>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireShape {
    class: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dims: Vec<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireCreation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    layout: Option<WireLayout>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    filters: Vec<WireFilter>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireLayout {
    class: String,
    dims: Vec<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFilter {
    class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    level: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireAttr {
    name: String,
    #[serde(flatten)]
    value: WireAttrValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
enum WireAttrValue {
    F64(f64),
    I64(i64),
    String(String),
    F64Array(Vec<f64>),
    I64Array(Vec<i64>),
}

impl From<&AttrValue> for WireAttrValue {
    fn from(value: &AttrValue) -> WireAttrValue {
        match value {
            AttrValue::F64(v) => WireAttrValue::F64(*v),
            AttrValue::I64(v) => WireAttrValue::I64(*v),
            AttrValue::String(v) => WireAttrValue::String(v.clone()),
            AttrValue::F64Array(v) => WireAttrValue::F64Array(v.clone()),
            AttrValue::I64Array(v) => WireAttrValue::I64Array(v.clone()),
        }
    }
}

impl From<&WireAttrValue> for AttrValue {
    fn from(value: &WireAttrValue) -> AttrValue {
        match value {
            WireAttrValue::F64(v) => AttrValue::F64(*v),
            WireAttrValue::I64(v) => AttrValue::I64(*v),
            WireAttrValue::String(v) => AttrValue::String(v.clone()),
            WireAttrValue::F64Array(v) => AttrValue::F64Array(v.clone()),
            WireAttrValue::I64Array(v) => AttrValue::I64Array(v.clone()),
        }
    }
}

// ---------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------

/// File-backed container store.
///
/// Writes are staged in memory; the container file is produced once, on
/// close. A failed close leaves the staging intact and no partial file
/// guarantee beyond what the filesystem gives.
#[derive(Debug)]
pub struct H5JsonStore {
    staging: MemStore,
    path: PathBuf,
}

impl H5JsonStore {
    /// Store that will write its container to `path` on close.
    pub fn create(path: impl Into<PathBuf>) -> H5JsonStore {
        H5JsonStore { staging: MemStore::new(), path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ObjectStore for H5JsonStore {
    fn name(&self) -> &str {
        "h5json"
    }

    fn root(&self) -> ObjectId {
        self.staging.root()
    }

    fn create_group(&mut self, parent: ObjectId, name: &str) -> Result<ObjectId, StoreError> {
        self.staging.create_group(parent, name)
    }

    fn set_attr(&mut self, handle: ObjectId, name: &str, value: &AttrValue) -> Result<(), StoreError> {
        self.staging.set_attr(handle, name, value)
    }

    fn create_dataset(
        &mut self,
        parent: ObjectId,
        name: &str,
        shape: &[u64],
        elem: ElementType,
        options: &StoreOptions,
    ) -> Result<ObjectId, StoreError> {
        self.staging.create_dataset(parent, name, shape, elem, options)
    }

    fn write(&mut self, handle: ObjectId, data: &[u8]) -> Result<(), StoreError> {
        self.staging.write(handle, data)
    }

    fn create_link(&mut self, parent: ObjectId, name: &str, target: ObjectId) -> Result<(), StoreError> {
        self.staging.create_link(parent, name, target)
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if self.staging.is_closed() {
            return Err(StoreError::Closed);
        }
        let container = to_wire(&self.staging)?;
        let text = serde_json::to_string_pretty(&container)
            .map_err(|e| StoreError::Backend(format!("container serialization failed: {e}")))?;
        fs::write(&self.path, text)?;
        self.staging.close()
    }
}

fn to_wire(staging: &MemStore) -> Result<WireContainer, StoreError> {
    // Wire ids are per-collection: groups count up as g-N, datasets as d-N.
    let mut ids = Vec::with_capacity(staging.object_count());
    let (mut next_group, mut next_dataset) = (0u64, 0u64);
    for index in 0..staging.object_count() {
        if staging.is_group(ObjectId(index as u64)) {
            ids.push(format!("g-{next_group}"));
            next_group += 1;
        } else {
            ids.push(format!("d-{next_dataset}"));
            next_dataset += 1;
        }
    }

    let mut groups = IndexMap::new();
    let mut datasets = IndexMap::new();
    for index in 0..staging.object_count() {
        let id = ObjectId(index as u64);
        let attributes = wire_attrs(staging, id);
        if staging.is_group(id) {
            let members = staging
                .members(id)
                .ok_or_else(|| StoreError::Backend(format!("staged group {id} lost its members")))?;
            let links = members
                .into_iter()
                .map(|(title, target)| WireLink {
                    title: title.to_string(),
                    class: HARD_LINK.to_string(),
                    id: ids[target.0 as usize].clone(),
                })
                .collect();
            groups.insert(ids[index].clone(), WireGroup { links, attributes });
        } else {
            datasets.insert(ids[index].clone(), wire_dataset(staging, id, attributes)?);
        }
    }

    Ok(WireContainer {
        api_version: API_VERSION.to_string(),
        root: ids[0].clone(),
        groups,
        datasets,
    })
}

fn wire_attrs(staging: &MemStore, id: ObjectId) -> Vec<WireAttr> {
    let Some(attrs) = staging.attrs(id) else {
        return Vec::new();
    };
    attrs
        .iter()
        .map(|(name, value)| WireAttr { name: name.clone(), value: value.into() })
        .collect()
}

fn wire_dataset(staging: &MemStore, id: ObjectId, attributes: Vec<WireAttr>) -> Result<WireDataset, StoreError> {
    let missing = || StoreError::Backend(format!("staged dataset {id} lost its body"));
    let shape = staging.dataset_shape(id).ok_or_else(missing)?;
    let elem = staging.dataset_elem(id).ok_or_else(missing)?;
    let options = staging.dataset_options(id).ok_or_else(missing)?;
    let raw = staging.dataset_bytes(id).ok_or_else(missing)?;

    // Filter pipeline runs shuffle first, deflate second; readers undo it
    // in reverse.
    let mut payload = raw.to_vec();
    let mut filters = Vec::new();
    if options.shuffle {
        payload = shuffle(&payload, elem.size_bytes() as usize);
        filters.push(WireFilter { class: SHUFFLE_FILTER.to_string(), level: None });
    }
    if let Some(level) = options.deflate_level {
        payload = deflate(&payload, level)?;
        filters.push(WireFilter { class: DEFLATE_FILTER.to_string(), level: Some(level) });
    }

    let layout = options.chunk_dims.as_ref().map(|dims| WireLayout {
        class: CHUNKED_LAYOUT.to_string(),
        dims: dims.clone(),
    });
    let creation = if layout.is_some() || !filters.is_empty() {
        Some(WireCreation { layout, filters })
    } else {
        None
    };

    Ok(WireDataset {
        shape: if shape.is_empty() {
            WireShape { class: SCALAR_SHAPE.to_string(), dims: Vec::new() }
        } else {
            WireShape { class: SIMPLE_SHAPE.to_string(), dims: shape.to_vec() }
        },
        dtype: elem.to_string(),
        creation,
        value: BASE64.encode(&payload),
        attributes,
    })
}

// ---------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------

/// Read-only view of a finished container file.
///
/// Objects are addressed by their wire ids (`g-0`, `d-3`, ...); use
/// [`resolve`](H5JsonFile::resolve) to turn slash-separated paths into
/// ids.
#[derive(Debug)]
pub struct H5JsonFile {
    container: WireContainer,
}

impl H5JsonFile {
    pub fn open(path: impl AsRef<Path>) -> Result<H5JsonFile, StoreError> {
        let text = fs::read_to_string(path)?;
        let container: WireContainer = serde_json::from_str(&text)
            .map_err(|e| StoreError::Backend(format!("malformed container: {e}")))?;
        if !container.groups.contains_key(&container.root) {
            return Err(StoreError::Backend(format!("root object '{}' is not a group", container.root)));
        }
        Ok(H5JsonFile { container })
    }

    /// Wire id of the container root group.
    pub fn root_id(&self) -> &str {
        &self.container.root
    }

    /// Resolve a slash-separated path from the root to a wire id.
    pub fn resolve(&self, path: &str) -> Option<&str> {
        let mut current = self.container.root.as_str();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            let group = self.container.groups.get(current)?;
            current = group.links.iter().find(|l| l.title == component)?.id.as_str();
        }
        Some(current)
    }

    pub fn is_group(&self, id: &str) -> bool {
        self.container.groups.contains_key(id)
    }

    /// Link titles of a group in stored order.
    pub fn link_titles(&self, id: &str) -> Option<Vec<&str>> {
        let group = self.container.groups.get(id)?;
        Some(group.links.iter().map(|l| l.title.as_str()).collect())
    }

    pub fn attr(&self, id: &str, name: &str) -> Option<AttrValue> {
        let attributes = if let Some(group) = self.container.groups.get(id) {
            &group.attributes
        } else {
            &self.container.datasets.get(id)?.attributes
        };
        attributes.iter().find(|a| a.name == name).map(|a| (&a.value).into())
    }

    /// Dataspace dimensions; empty means scalar.
    pub fn dataset_shape(&self, id: &str) -> Option<Vec<u64>> {
        let dataset = self.container.datasets.get(id)?;
        if dataset.shape.class == SCALAR_SHAPE {
            Some(Vec::new())
        } else {
            Some(dataset.shape.dims.clone())
        }
    }

    pub fn dataset_elem(&self, id: &str) -> Option<ElementType> {
        ElementType::parse(&self.container.datasets.get(id)?.dtype)
    }

    pub fn chunk_dims(&self, id: &str) -> Option<Vec<u64>> {
        let creation = self.container.datasets.get(id)?.creation.as_ref()?;
        let layout = creation.layout.as_ref()?;
        (layout.class == CHUNKED_LAYOUT).then(|| layout.dims.clone())
    }

    pub fn deflate_level(&self, id: &str) -> Option<u32> {
        let creation = self.container.datasets.get(id)?.creation.as_ref()?;
        creation.filters.iter().find(|f| f.class == DEFLATE_FILTER)?.level
    }

    /// Raw little-endian payload with all stored filters undone.
    pub fn dataset_payload(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let dataset = self
            .container
            .datasets
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let mut payload = BASE64
            .decode(&dataset.value)
            .map_err(|e| StoreError::Backend(format!("payload of '{id}' is not base64: {e}")))?;
        if let Some(creation) = &dataset.creation {
            if creation.filters.iter().any(|f| f.class == DEFLATE_FILTER) {
                payload = inflate(&payload)?;
            }
            if creation.filters.iter().any(|f| f.class == SHUFFLE_FILTER) {
                let elem = ElementType::parse(&dataset.dtype)
                    .ok_or_else(|| StoreError::Backend(format!("unknown element type '{}'", dataset.dtype)))?;
                payload = unshuffle(&payload, elem.size_bytes() as usize);
            }
        }
        Ok(payload)
    }

    pub fn read_f64(&self, id: &str) -> Result<Vec<f64>, StoreError> {
        self.expect_elem(id, ElementType::F64)?;
        let payload = self.dataset_payload(id)?;
        Ok(payload
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect())
    }

    pub fn read_i64(&self, id: &str) -> Result<Vec<i64>, StoreError> {
        self.expect_elem(id, ElementType::I64)?;
        let payload = self.dataset_payload(id)?;
        Ok(payload
            .chunks_exact(8)
            .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect())
    }

    pub fn read_i32(&self, id: &str) -> Result<Vec<i32>, StoreError> {
        self.expect_elem(id, ElementType::I32)?;
        let payload = self.dataset_payload(id)?;
        Ok(payload
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    pub fn read_str(&self, id: &str) -> Result<String, StoreError> {
        match self.dataset_elem(id) {
            Some(ElementType::Str(_)) => {}
            _ => return Err(StoreError::Backend(format!("dataset '{id}' is not a string"))),
        }
        let payload = self.dataset_payload(id)?;
        String::from_utf8(payload).map_err(|e| StoreError::Backend(format!("dataset '{id}' is not utf-8: {e}")))
    }

    fn expect_elem(&self, id: &str, want: ElementType) -> Result<(), StoreError> {
        match self.dataset_elem(id) {
            Some(elem) if elem == want => Ok(()),
            Some(elem) => Err(StoreError::Backend(format!("dataset '{id}' stores {elem}, not {want}"))),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }
}

// ---------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------

fn deflate(data: &[u8], level: u32) -> Result<Vec<u8>, StoreError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut out = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

/// Byte-transpose `data` as `n` elements of `size` bytes: all first bytes,
/// then all second bytes, and so on. Data that is not a whole number of
/// elements is returned unchanged.
fn shuffle(data: &[u8], size: usize) -> Vec<u8> {
    if size <= 1 || data.len() % size != 0 {
        return data.to_vec();
    }
    let n = data.len() / size;
    let mut out = vec![0u8; data.len()];
    for i in 0..n {
        for k in 0..size {
            out[k * n + i] = data[i * size + k];
        }
    }
    out
}

fn unshuffle(data: &[u8], size: usize) -> Vec<u8> {
    if size <= 1 || data.len() % size != 0 {
        return data.to_vec();
    }
    let n = data.len() / size;
    let mut out = vec![0u8; data.len()];
    for i in 0..n {
        for k in 0..size {
            out[i * size + k] = data[k * n + i];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_transposes_element_bytes() {
        let data = [1u8, 2, 3, 4, 5, 6];
        assert_eq!(shuffle(&data, 2), vec![1, 3, 5, 2, 4, 6]);
        assert_eq!(unshuffle(&shuffle(&data, 2), 2), data.to_vec());
        // Not a whole number of elements: passed through.
        assert_eq!(shuffle(&data, 4), data.to_vec());
    }

    #[test]
    fn deflate_round_trips() {
        let data = vec![0u8; 4096];
        let packed = deflate(&data, 9).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(inflate(&packed).unwrap(), data);
    }

    #[test]
    fn attr_values_survive_the_wire_form() {
        let values = [
            AttrValue::F64(0.075),
            AttrValue::I64(-3),
            AttrValue::String("mm".into()),
            AttrValue::F64Array(vec![38.37, 38.655, 0.0]),
            AttrValue::I64Array(vec![0, 0]),
        ];
        for value in values {
            let wire: WireAttrValue = (&value).into();
            let text = serde_json::to_string(&wire).unwrap();
            let parsed: WireAttrValue = serde_json::from_str(&text).unwrap();
            assert_eq!(AttrValue::from(&parsed), value);
        }
    }
}
