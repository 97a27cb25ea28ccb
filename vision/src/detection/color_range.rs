use ndarray::Array2;

use super::{check_geometry, select_region, DetectionError, DetectionResult, DetectorConfig, ObjectDetector};
use crate::frame::Frame;
use crate::image_proc::in_range;

/// Static HSV color-range detector.
///
/// Foreground is every live pixel inside `config.hsv`. The reference frame
/// only participates in the geometry check, so this strategy suits trays
/// whose surface falls outside the configured range.
#[derive(Debug, Clone)]
pub struct ColorRangeDetector {
    config: DetectorConfig,
    mask: Option<Array2<bool>>,
}

impl ColorRangeDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config, mask: None }
    }

    pub fn with_mask(mut self, mask: Array2<bool>) -> Self {
        self.mask = Some(mask);
        self
    }
}

impl ObjectDetector for ColorRangeDetector {
    fn detect(&self, reference: &Frame, live: &Frame) -> Result<DetectionResult, DetectionError> {
        check_geometry(reference, live, self.mask.as_ref())?;

        let hsv = live.to_hsv();
        let foreground = in_range(hsv.view(), self.config.hsv.lower, self.config.hsv.upper);
        Ok(select_region(foreground, self.mask.as_ref(), &self.config))
    }

    fn name(&self) -> &'static str {
        "color_range"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::HsvRange;
    use crate::image_size::ImageSize;

    fn gray_tray() -> Frame {
        Frame::filled(ImageSize::from_width_height(160, 120), [128, 128, 128])
    }

    #[test]
    fn saturated_object_on_gray_tray() {
        let mut live = gray_tray();
        live.fill_rect(30, 30, 30, 30, [200, 30, 30]);

        let result = ColorRangeDetector::new(DetectorConfig::default())
            .detect(&gray_tray(), &live)
            .unwrap();
        assert!(result.found);
        let c = result.centroid_rectified.unwrap();
        assert!((c.x - 44.5).abs() < 1.0 && (c.y - 44.5).abs() < 1.0);
    }

    #[test]
    fn hue_outside_range_is_ignored() {
        let mut live = gray_tray();
        live.fill_rect(30, 30, 30, 30, [30, 30, 200]);

        // Reds only
        let config = DetectorConfig {
            hsv: HsvRange {
                lower: [0, 100, 100],
                upper: [10, 255, 255],
            },
            ..DetectorConfig::default()
        };
        let result = ColorRangeDetector::new(config).detect(&gray_tray(), &live).unwrap();
        assert!(!result.found);
    }

    #[test]
    fn empty_tray_has_no_detection() {
        let result = ColorRangeDetector::new(DetectorConfig::default())
            .detect(&gray_tray(), &gray_tray())
            .unwrap();
        assert!(!result.found);
    }
}
