//! Storage backends for [`rustynexus_tree`] trees.
//!
//! Two [`ObjectStore`](rustynexus_tree::ObjectStore) implementations live
//! here: [`MemStore`], an in-memory container with a read-back API, and
//! [`H5JsonStore`], which persists a container to a single JSON file in
//! the h5json vocabulary. [`H5JsonFile`] is the matching reader.

pub mod h5json;
pub mod memory;

pub use h5json::{H5JsonFile, H5JsonStore};
pub use memory::MemStore;
