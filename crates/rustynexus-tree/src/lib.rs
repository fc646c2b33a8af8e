//! In-memory group/dataset trees and a single-pass write engine for
//! putting them into pluggable storage backends.
//!
//! The model mirrors the object layout of hierarchical scientific
//! containers: named groups holding attributes, child groups and
//! datasets, plus hard links that expose one object under several paths.
//! Construction is get-or-create and never fails; all storage work
//! happens in one [`write_tree`] pass against an [`ObjectStore`]
//! implementation.
//!
//! # Example
//!
//! ```
//! use rustynexus_tree::{AttrValue, DataValue, StoreOptions, Tree};
//!
//! let mut tree = Tree::new("entry", &[("NX_class", AttrValue::from("NXentry"))]);
//! let root = tree.root();
//! let instrument = tree.group(root, "instrument", &[("NX_class", "NXinstrument".into())]);
//! let two_theta = tree.dataset(
//!     instrument,
//!     "two_theta",
//!     DataValue::F64(0.0),
//!     &[("units", "degrees".into())],
//!     StoreOptions::default(),
//! );
//! assert_eq!(tree.dataset_path(two_theta), "entry/instrument/two_theta");
//! ```

pub mod link;
pub mod node;
pub mod store;
pub mod value;
pub mod write;

pub use link::Link;
pub use node::{DatasetId, DatasetNode, GroupId, GroupNode, NodeId, Tree};
pub use store::{ObjectId, ObjectStore, StoreError, StoreOptions};
pub use value::{AttrValue, DataValue, ElementType, NdArray, ValueKind};
pub use write::write_tree;
