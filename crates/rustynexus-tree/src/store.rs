//! The storage backend contract.
//!
//! A [`Tree`](crate::node::Tree) is materialized through an injected
//! [`ObjectStore`]: the small set of object operations a container format
//! must provide. One store instance corresponds to one output container.
//!
//! ```text
//! ┌──────────────────────────┐
//! │ Tree / write_tree pass   │
//! ├──────────────────────────┤
//! │       ObjectStore        │  ← trait defined here
//! ├────────────┬─────────────┤
//! │   memory   │   h5json    │  ← pluggable backends
//! └────────────┴─────────────┘
//! ```
//!
//! Implementations decide what a handle means; the write pass only threads
//! handles from creation calls into later attribute, payload and link
//! calls.

use std::fmt;
use std::io;

use crate::value::{AttrValue, ElementType};

/// Opaque handle to an object living in a backend.
///
/// Handles are issued by the store that created the object and are only
/// meaningful to that store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors reported by storage backends.
///
/// Any of these aborts the write pass that triggered it. Backends make no
/// rollback promises: objects created before the failure stay created.
#[derive(Debug)]
pub enum StoreError {
    /// I/O failure in the underlying storage.
    Io(io::Error),
    /// `parent` already has a member named `name`.
    AlreadyExists { parent: ObjectId, name: String },
    /// The handle does not identify a live object in this store.
    StaleHandle(ObjectId),
    /// A group handle was required.
    NotAGroup(ObjectId),
    /// A dataset handle was required.
    NotADataset(ObjectId),
    /// No object at the given path.
    NotFound(String),
    /// The store was already closed.
    Closed,
    /// Backend-specific failure.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "i/o error: {e}"),
            StoreError::AlreadyExists { parent, name } => {
                write!(f, "object {parent} already has a member named '{name}'")
            }
            StoreError::StaleHandle(id) => write!(f, "stale object handle {id}"),
            StoreError::NotAGroup(id) => write!(f, "object {id} is not a group"),
            StoreError::NotADataset(id) => write!(f, "object {id} is not a dataset"),
            StoreError::NotFound(path) => write!(f, "no object at '{path}'"),
            StoreError::Closed => write!(f, "store is closed"),
            StoreError::Backend(msg) => write!(f, "backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// Creation hints for one dataset, forwarded to the backend verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreOptions {
    /// Chunk dimensions, one entry per dataset dimension.
    pub chunk_dims: Option<Vec<u64>>,
    /// Deflate compression level (0-9). `None` disables deflate.
    pub deflate_level: Option<u32>,
    /// Apply the byte-shuffle filter ahead of compression.
    pub shuffle: bool,
    /// Store numeric scalars and sequences as this element type instead of
    /// the one inferred from the value. Text and explicit arrays carry
    /// their own element type and ignore the override.
    pub element_type: Option<ElementType>,
}

impl StoreOptions {
    /// Options requesting a chunked layout.
    pub fn chunked(dims: &[u64]) -> StoreOptions {
        StoreOptions {
            chunk_dims: Some(dims.to_vec()),
            ..StoreOptions::default()
        }
    }

    /// Enable deflate compression at the given level.
    pub fn with_deflate(mut self, level: u32) -> StoreOptions {
        self.deflate_level = Some(level);
        self
    }

    /// Enable the byte-shuffle filter.
    pub fn with_shuffle(mut self) -> StoreOptions {
        self.shuffle = true;
        self
    }

    /// Override the stored element type.
    pub fn with_element_type(mut self, elem: ElementType) -> StoreOptions {
        self.element_type = Some(elem);
        self
    }

    /// Whether any layout or filter hint is set.
    pub fn wants_pipeline(&self) -> bool {
        self.chunk_dims.is_some() || self.deflate_level.is_some() || self.shuffle
    }
}

/// Object operations a container backend provides to the write pass.
///
/// The trait is object safe; the engine works against `&mut dyn
/// ObjectStore` so backends can be swapped without touching tree code.
pub trait ObjectStore {
    /// Short backend name, for diagnostics.
    fn name(&self) -> &str;

    /// Handle of the container root: the object the tree's root group is
    /// created under.
    fn root(&self) -> ObjectId;

    /// Create a group under `parent`.
    ///
    /// Fails with [`StoreError::AlreadyExists`] when `parent` already has
    /// a member named `name`; backends keep one name table per group.
    fn create_group(&mut self, parent: ObjectId, name: &str) -> Result<ObjectId, StoreError>;

    /// Attach one attribute to a group or dataset.
    fn set_attr(&mut self, handle: ObjectId, name: &str, value: &AttrValue) -> Result<(), StoreError>;

    /// Create a dataset under `parent`.
    ///
    /// `shape` is the dataspace where an empty slice means scalar; `elem`
    /// is the resolved element type; `options` carries the caller's
    /// creation hints unchanged.
    fn create_dataset(
        &mut self,
        parent: ObjectId,
        name: &str,
        shape: &[u64],
        elem: ElementType,
        options: &StoreOptions,
    ) -> Result<ObjectId, StoreError>;

    /// Write a dataset's full payload as raw little-endian bytes.
    fn write(&mut self, handle: ObjectId, data: &[u8]) -> Result<(), StoreError>;

    /// Expose `target` under `parent` as `name` without copying it: a
    /// hard link, two names for one object.
    fn create_link(&mut self, parent: ObjectId, name: &str, target: ObjectId) -> Result<(), StoreError>;

    /// Flush and close the container. Operations after close fail with
    /// [`StoreError::Closed`].
    fn close(&mut self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_builders_compose() {
        let opts = StoreOptions::chunked(&[1, 16, 16]).with_deflate(9).with_shuffle();
        assert_eq!(opts.chunk_dims.as_deref(), Some(&[1, 16, 16][..]));
        assert_eq!(opts.deflate_level, Some(9));
        assert!(opts.shuffle);
        assert!(opts.wants_pipeline());
        assert!(!StoreOptions::default().wants_pipeline());
    }

    #[test]
    fn error_display_names_the_member() {
        let err = StoreError::AlreadyExists { parent: ObjectId(3), name: "data".into() };
        assert_eq!(err.to_string(), "object #3 already has a member named 'data'");
    }

    #[test]
    fn io_errors_convert_and_chain() {
        let err: StoreError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
