use ndarray::Array2;

use super::{check_geometry, select_region, DetectionError, DetectionResult, DetectorConfig, ObjectDetector};
use crate::frame::Frame;
use crate::image_proc::{abs_diff, apply_threshold, gaussian_blur};

/// Reference-difference detector.
///
/// Both frames are reduced to intensity, optionally blurred, and differenced
/// pixel by pixel. Pixels whose difference exceeds `threshold` form the
/// foreground mask.
#[derive(Debug, Clone)]
pub struct DifferenceDetector {
    config: DetectorConfig,
    mask: Option<Array2<bool>>,
}

impl DifferenceDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config, mask: None }
    }

    /// Ignore everything outside `mask`.
    pub fn with_mask(mut self, mask: Array2<bool>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn intensity(&self, frame: &Frame) -> Array2<u8> {
        let gray = frame.to_gray();
        match self.config.blur {
            Some(blur) => gaussian_blur(gray.view(), blur.kernel_size, blur.sigma),
            None => gray,
        }
    }
}

impl ObjectDetector for DifferenceDetector {
    fn detect(&self, reference: &Frame, live: &Frame) -> Result<DetectionResult, DetectionError> {
        check_geometry(reference, live, self.mask.as_ref())?;

        let diff = abs_diff(self.intensity(reference).view(), self.intensity(live).view());
        let foreground = apply_threshold(diff.view(), self.config.threshold);
        Ok(select_region(foreground, self.mask.as_ref(), &self.config))
    }

    fn name(&self) -> &'static str {
        "difference"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BlurConfig;
    use crate::image_size::ImageSize;
    use crate::Point2D;

    fn tray() -> Frame {
        Frame::filled(ImageSize::from_width_height(200, 160), [90, 90, 90])
    }

    #[test]
    fn faint_change_stays_below_threshold() {
        let reference = tray();
        let mut live = tray();
        live.fill_rect(50, 50, 30, 30, [130, 130, 130]);

        let result = DifferenceDetector::new(DetectorConfig::default())
            .detect(&reference, &live)
            .unwrap();
        assert!(!result.found);
        assert_eq!(result.foreground_fraction, 0.0);
    }

    #[test]
    fn dark_object_on_light_tray_is_found() {
        let reference = Frame::filled(ImageSize::from_width_height(200, 160), [220, 220, 220]);
        let mut live = reference.clone();
        live.fill_rect(120, 40, 30, 20, [20, 20, 20]);

        let result = DifferenceDetector::new(DetectorConfig::default())
            .detect(&reference, &live)
            .unwrap();
        assert!(result.found);
        let c = result.centroid_rectified.unwrap();
        assert!((c.x - 134.5).abs() < 1.0 && (c.y - 49.5).abs() < 1.0, "{c}");
    }

    #[test]
    fn speckle_noise_is_cleaned_away() {
        let reference = tray();
        let mut live = tray();
        for i in 0..15 {
            live.set_pixel(10 + i * 12, 20 + (i * 7) % 100, [255, 255, 255]);
        }

        let result = DifferenceDetector::new(DetectorConfig::default())
            .detect(&reference, &live)
            .unwrap();
        assert!(!result.found);
        assert_eq!(result.region_count, 0);
        assert!(result.foreground_fraction > 0.0);
    }

    #[test]
    fn mask_hides_object_outside_region() {
        let reference = tray();
        let mut live = tray();
        live.fill_rect(150, 100, 30, 30, [255, 255, 255]);

        let mask = Array2::from_shape_fn((160, 200), |(_, c)| c < 100);
        let detector = DifferenceDetector::new(DetectorConfig::default()).with_mask(mask);
        assert!(!detector.detect(&reference, &live).unwrap().found);
    }

    #[test]
    fn blur_keeps_solid_object() {
        let reference = tray();
        let mut live = tray();
        live.fill_rect(60, 60, 40, 40, [255, 255, 255]);

        let config = DetectorConfig {
            blur: Some(BlurConfig::default()),
            ..DetectorConfig::default()
        };
        let result = DifferenceDetector::new(config).detect(&reference, &live).unwrap();
        assert!(result.found);
        let c = result.centroid_rectified.unwrap();
        assert!(c.distance_to(&Point2D::new(79.5, 79.5)) < 1.0);
    }

    #[test]
    fn mask_of_wrong_size_is_rejected() {
        let detector = DifferenceDetector::new(DetectorConfig::default())
            .with_mask(Array2::from_elem((10, 10), true));
        assert!(matches!(
            detector.detect(&tray(), &tray()),
            Err(DetectionError::MaskMismatch { .. })
        ));
    }
}
