use image::{GrayImage, Luma};
use ndarray::Array2;

use super::{check_geometry, select_region, DetectionError, DetectionResult, DetectorConfig, ObjectDetector};
use crate::frame::Frame;
use crate::image_proc::{dilate, fill_holes, gaussian_blur};

/// Canny edge detector.
///
/// The live frame is blurred and run through Canny. Closed outlines are
/// thickened by one 3x3 dilation and filled, so an object counts by the
/// area its outer contour encloses. Like [`super::ColorRangeDetector`], the
/// reference frame only participates in the geometry check.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    config: DetectorConfig,
    mask: Option<Array2<bool>>,
}

impl EdgeDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config, mask: None }
    }

    pub fn with_mask(mut self, mask: Array2<bool>) -> Self {
        self.mask = Some(mask);
        self
    }

    fn edge_mask(&self, live: &Frame) -> Array2<bool> {
        let blur = self.config.blur.unwrap_or_default();
        let gray = gaussian_blur(live.to_gray().view(), blur.kernel_size, blur.sigma);
        let (rows, cols) = gray.dim();

        let image = GrayImage::from_fn(cols as u32, rows as u32, |x, y| Luma([gray[[y as usize, x as usize]]]));
        let edges = imageproc::edges::canny(&image, self.config.canny.low, self.config.canny.high);

        let outlines = Array2::from_shape_fn((rows, cols), |(y, x)| edges.get_pixel(x as u32, y as u32)[0] > 0);
        fill_holes(dilate(outlines.view(), 3, 1).view())
    }
}

impl ObjectDetector for EdgeDetector {
    fn detect(&self, reference: &Frame, live: &Frame) -> Result<DetectionResult, DetectionError> {
        check_geometry(reference, live, self.mask.as_ref())?;
        Ok(select_region(self.edge_mask(live), self.mask.as_ref(), &self.config))
    }

    fn name(&self) -> &'static str {
        "edges"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_size::ImageSize;

    fn gray_tray() -> Frame {
        Frame::filled(ImageSize::from_width_height(160, 120), [128, 128, 128])
    }

    #[test]
    fn outlined_object_is_found_at_its_center() {
        let mut live = gray_tray();
        live.fill_rect(40, 30, 40, 40, [230, 230, 230]);

        let result = EdgeDetector::new(DetectorConfig::default())
            .detect(&gray_tray(), &live)
            .unwrap();
        assert!(result.found);
        let c = result.centroid_rectified.unwrap();
        assert!((c.x - 59.5).abs() < 2.0 && (c.y - 49.5).abs() < 2.0, "centroid {c}");
        assert!(result.area >= 1600.0);
    }

    #[test]
    fn featureless_tray_has_no_edges() {
        let result = EdgeDetector::new(DetectorConfig::default())
            .detect(&gray_tray(), &gray_tray())
            .unwrap();
        assert!(!result.found);
        assert_eq!(result.foreground_fraction, 0.0);
    }

    #[test]
    fn faint_outline_is_below_the_low_threshold() {
        let mut live = gray_tray();
        live.fill_rect(40, 30, 40, 40, [133, 133, 133]);

        let result = EdgeDetector::new(DetectorConfig::default())
            .detect(&gray_tray(), &live)
            .unwrap();
        assert!(!result.found);
    }

    #[test]
    fn strategy_selects_edge_detector() {
        let config = DetectorConfig {
            strategy: crate::detection::DetectionStrategy::Edges,
            ..DetectorConfig::default()
        };
        assert_eq!(crate::detection::build_detector(&config, None).name(), "edges");
    }

    #[test]
    fn mismatched_frames_are_rejected() {
        let live = Frame::filled(ImageSize::from_width_height(80, 60), [128, 128, 128]);
        let err = EdgeDetector::new(DetectorConfig::default())
            .detect(&gray_tray(), &live)
            .unwrap_err();
        assert!(matches!(err, DetectionError::GeometryMismatch { .. }));
    }
}
