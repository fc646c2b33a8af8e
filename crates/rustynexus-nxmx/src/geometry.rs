//! Detector geometry parameters and the values derived from them.

use rustynexus_tree::ElementType;

/// Everything the entry builder needs to describe one detector.
///
/// The defaults describe a synthetic pixel-array detector mounted on the
/// beam axis: a 16-frame stack of 1024x2048 modules with 75 micron
/// pixels, read out at 10 ms per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorGeometry {
    pub description: String,
    pub detector_type: String,
    pub sensor_material: String,
    pub sensor_thickness_mm: f64,
    pub saturation_value: i64,
    pub count_time_s: f64,
    /// Beam centre in pixels, x then y.
    pub beam_centre_px: [f64; 2],
    /// Pixel size in millimetres, x then y.
    pub pixel_size_mm: [f64; 2],
    /// Detector distance along the beam, millimetres.
    pub detector_distance_mm: f64,
    /// Detector swing angle, degrees.
    pub two_theta_deg: f64,
    /// Module extent in pixels, slow then fast.
    pub module_size: [u64; 2],
    /// Frames in the data stack.
    pub frame_count: u64,
    /// Element type of the frame data.
    pub frame_elem: ElementType,
    /// Deflate level for the frame data; `None` stores it raw.
    pub deflate_level: Option<u32>,
}

impl Default for DetectorGeometry {
    fn default() -> DetectorGeometry {
        DetectorGeometry {
            description: "cyberdyne 101".to_string(),
            detector_type: "pixel".to_string(),
            sensor_material: "silicon".to_string(),
            sensor_thickness_mm: 0.45,
            saturation_value: 1 << 12,
            count_time_s: 0.01,
            beam_centre_px: [511.6, 515.4],
            pixel_size_mm: [0.075, 0.075],
            detector_distance_mm: 100.0,
            two_theta_deg: 0.0,
            module_size: [1024, 2048],
            frame_count: 16,
            frame_elem: ElementType::I64,
            deflate_level: Some(9),
        }
    }
}

impl DetectorGeometry {
    /// Beam centre converted from pixels to millimetres.
    pub fn beam_centre_mm(&self) -> [f64; 2] {
        [
            self.beam_centre_px[0] * self.pixel_size_mm[0],
            self.beam_centre_px[1] * self.pixel_size_mm[1],
        ]
    }

    /// Module offset from the lab origin: the beam centre in millimetres,
    /// nothing along the beam.
    pub fn module_offset_mm(&self) -> [f64; 3] {
        let [x, y] = self.beam_centre_mm();
        [x, y, 0.0]
    }

    /// Shape of the frame stack: frames first, then the module extent.
    pub fn frame_shape(&self) -> [u64; 3] {
        [self.frame_count, self.module_size[0], self.module_size[1]]
    }

    /// One frame per chunk.
    pub fn chunk_dims(&self) -> [u64; 3] {
        [1, self.module_size[0], self.module_size[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry_matches_the_reference_detector() {
        let geometry = DetectorGeometry::default();
        assert_eq!(geometry.saturation_value, 4096);
        assert_eq!(geometry.frame_shape(), [16, 1024, 2048]);
        assert_eq!(geometry.chunk_dims(), [1, 1024, 2048]);
        assert_eq!(geometry.deflate_level, Some(9));
    }

    #[test]
    fn beam_centre_converts_to_millimetres() {
        let geometry = DetectorGeometry::default();
        assert_eq!(geometry.beam_centre_mm(), [511.6 * 0.075, 515.4 * 0.075]);
        assert_eq!(geometry.module_offset_mm()[2], 0.0);
    }
}
