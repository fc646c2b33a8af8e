//! NXmx-style detector entries built as [`rustynexus_tree`] trees.
//!
//! [`DetectorGeometry`] collects the parameters of one detector;
//! [`build_tree`] turns them into a complete `entry` tree following the
//! NXmx application layout, including the `depends_on` transformation
//! chain, the detector module description and the chunked frame stack.
//! The result is written out through any backend the engine accepts.

pub mod entry;
pub mod geometry;

pub use entry::build_tree;
pub use geometry::DetectorGeometry;

/// Attribute name carrying a node's NeXus class.
pub const NX_CLASS: &str = "NX_class";

pub const NX_ENTRY: &str = "NXentry";
pub const NX_INSTRUMENT: &str = "NXinstrument";
pub const NX_DETECTOR: &str = "NXdetector";
pub const NX_POSITIONER: &str = "NXpositioner";
pub const NX_TRANSFORMATIONS: &str = "NXtransformations";
pub const NX_DETECTOR_MODULE: &str = "NXdetector_module";
pub const NX_DATA: &str = "NXdata";
