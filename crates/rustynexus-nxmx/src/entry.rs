//! Builds the tree for one NXmx-style detector entry.

use rustynexus_tree::{AttrValue, DataValue, NdArray, StoreOptions, Tree};

use crate::geometry::DetectorGeometry;
use crate::{
    NX_CLASS, NX_DATA, NX_DETECTOR, NX_DETECTOR_MODULE, NX_ENTRY, NX_INSTRUMENT, NX_POSITIONER,
    NX_TRANSFORMATIONS,
};

/// Assemble the entry tree for the given detector.
///
/// The positioner and module datasets carry NeXus transformation
/// attributes chained through `depends_on` paths: `two_theta` anchors the
/// chain at `"."`, the detector distance `z` depends on `two_theta`, the
/// module offset depends on `z`, and the pixel direction vectors depend
/// on each other down to the module offset. Paths are taken from the live
/// tree, so the chain stays consistent with wherever the nodes actually
/// sit.
pub fn build_tree(geometry: &DetectorGeometry) -> Tree {
    let mut tree = Tree::new("entry", &[(NX_CLASS, NX_ENTRY.into())]);
    let root = tree.root();
    let instrument = tree.group(root, "instrument", &[(NX_CLASS, NX_INSTRUMENT.into())]);

    let detector = tree.group(instrument, "detector", &[(NX_CLASS, NX_DETECTOR.into())]);

    let d2t = tree.group(instrument, "detector_2t", &[(NX_CLASS, NX_POSITIONER.into())]);
    let two_theta = tree.dataset(
        d2t,
        "two_theta",
        DataValue::F64(geometry.two_theta_deg),
        &[
            ("units", "degrees".into()),
            ("transformation_type", "rotation".into()),
            ("vector", AttrValue::I64Array(vec![-1, 0, 0])),
            ("depends_on", ".".into()),
        ],
        StoreOptions::default(),
    );

    let dz = tree.group(instrument, "detector_z", &[(NX_CLASS, NX_POSITIONER.into())]);
    let two_theta_path = tree.dataset_path(two_theta);
    let z = tree.dataset(
        dz,
        "z",
        DataValue::F64(geometry.detector_distance_mm),
        &[
            ("units", "mm".into()),
            ("transformation_type", "translation".into()),
            ("vector", AttrValue::I64Array(vec![0, 0, 1])),
            ("depends_on", two_theta_path.into()),
        ],
        StoreOptions::default(),
    );

    tree.group(detector, "transformations", &[(NX_CLASS, NX_TRANSFORMATIONS.into())]);

    // Detector properties.
    tree.dataset(
        detector,
        "saturation_value",
        DataValue::I64(geometry.saturation_value),
        &[],
        StoreOptions::default(),
    );
    tree.dataset(
        detector,
        "count_time",
        DataValue::F64(geometry.count_time_s),
        &[("units", "s".into())],
        StoreOptions::default(),
    );
    tree.dataset(
        detector,
        "sensor_material",
        DataValue::Str(geometry.sensor_material.clone()),
        &[],
        StoreOptions::default(),
    );
    tree.dataset(
        detector,
        "sensor_thickness",
        DataValue::F64(geometry.sensor_thickness_mm),
        &[("units", "mm".into())],
        StoreOptions::default(),
    );
    tree.dataset(detector, "type", DataValue::Str(geometry.detector_type.clone()), &[], StoreOptions::default());
    tree.dataset(
        detector,
        "description",
        DataValue::Str(geometry.description.clone()),
        &[],
        StoreOptions::default(),
    );
    tree.dataset(
        detector,
        "beam_centre_x",
        DataValue::F64(geometry.beam_centre_px[0]),
        &[("units", "pixels".into())],
        StoreOptions::default(),
    );
    tree.dataset(
        detector,
        "beam_centre_y",
        DataValue::F64(geometry.beam_centre_px[1]),
        &[("units", "pixels".into())],
        StoreOptions::default(),
    );
    tree.dataset(
        detector,
        "x_pixel_size",
        DataValue::F64(geometry.pixel_size_mm[0]),
        &[("units", "mm".into())],
        StoreOptions::default(),
    );
    tree.dataset(
        detector,
        "y_pixel_size",
        DataValue::F64(geometry.pixel_size_mm[1]),
        &[("units", "mm".into())],
        StoreOptions::default(),
    );

    // Module layout and its leg of the transformation chain.
    let module = tree.group(detector, "module", &[(NX_CLASS, NX_DETECTOR_MODULE.into())]);
    tree.dataset(module, "data_origin", DataValue::I64Seq(vec![0, 0]), &[], StoreOptions::default());
    tree.dataset(
        module,
        "data_size",
        DataValue::I64Seq(vec![geometry.module_size[0] as i64, geometry.module_size[1] as i64]),
        &[],
        StoreOptions::default(),
    );
    tree.dataset(module, "data_stride", DataValue::I64Seq(vec![1, 1]), &[], StoreOptions::default());

    let z_path = tree.dataset_path(z);
    let module_offset = tree.dataset(
        module,
        "module_offset",
        DataValue::I64(0),
        &[
            ("transformation_type", "translation".into()),
            ("vector", AttrValue::I64Array(vec![0, 0, 0])),
            ("depends_on", z_path.into()),
            ("offset", AttrValue::F64Array(geometry.module_offset_mm().to_vec())),
            ("units", "mm".into()),
        ],
        StoreOptions::default(),
    );

    let module_offset_path = tree.dataset_path(module_offset);
    let fast = tree.dataset(
        module,
        "fast_pixel_direction",
        DataValue::F64(geometry.pixel_size_mm[0]),
        &[
            ("transformation_type", "translation".into()),
            ("vector", AttrValue::F64Array(vec![-1.0, 0.0, 0.0])),
            ("depends_on", module_offset_path.into()),
            ("offset", AttrValue::F64Array(vec![0.0, 0.0, 0.0])),
            ("units", "mm".into()),
        ],
        StoreOptions::default(),
    );

    let fast_path = tree.dataset_path(fast);
    tree.dataset(
        module,
        "slow_pixel_direction",
        DataValue::F64(geometry.pixel_size_mm[1]),
        &[
            ("transformation_type", "translation".into()),
            ("vector", AttrValue::F64Array(vec![0.0, -1.0, 0.0])),
            ("depends_on", fast_path.into()),
            ("offset", AttrValue::F64Array(vec![0.0, 0.0, 0.0])),
            ("units", "mm".into()),
        ],
        StoreOptions::default(),
    );

    // The frame stack, chunked one frame at a time.
    let mut options = StoreOptions::chunked(&geometry.chunk_dims());
    if let Some(level) = geometry.deflate_level {
        options = options.with_deflate(level);
    }
    let frames = tree.dataset(
        root,
        "zeros",
        NdArray::zeros(&geometry.frame_shape(), geometry.frame_elem).into(),
        &[],
        options,
    );

    // NXdata view onto the frame stack; the link shares the object rather
    // than copying it.
    let data_group = tree.group(root, "data", &[(NX_CLASS, NX_DATA.into())]);
    tree.set_group_attr(data_group, "signal", "data".into());
    tree.link(data_group, "data", frames);

    tree
}
