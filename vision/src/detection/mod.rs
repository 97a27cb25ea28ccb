//! Object detection on rectified tray frames.
//!
//! Every detector turns a (reference, live) pair of rectified frames into a
//! foreground mask and then runs the same region selection:
//!
//! 1. open then close with the configured square element
//! 2. dilate to merge fragments of one object
//! 3. fill enclosed holes so each region covers its outer contour
//! 4. label 8-connected regions and keep the largest
//! 5. reject it if its area is below `min_area`
//! 6. report its moment centroid and bounding box
//!
//! A miss is an ordinary [`DetectionResult`] with `found == false`, not an error.

mod color_range;
mod config;
mod difference;
mod edges;

pub use color_range::ColorRangeDetector;
pub use config::{BlurConfig, CannyThresholds, DetectionStrategy, DetectorConfig, HsvRange};
pub use difference::DifferenceDetector;
pub use edges::EdgeDetector;

use ndarray::Array2;
use thiserror::Error;
use tracing::debug;

use crate::frame::Frame;
use crate::geometry::{Point2D, RectifyTransform};
use crate::image_proc::{
    close, connected_components, dilate, extract_regions, fill_holes, open, BoundingBox,
};
use crate::image_size::ImageSize;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    /// Reference and live frames must share the rectified canvas.
    #[error("reference frame is {reference} but live frame is {live}")]
    GeometryMismatch { reference: ImageSize, live: ImageSize },

    #[error("region mask is {mask} but frames are {frame}")]
    MaskMismatch { mask: ImageSize, frame: ImageSize },
}

/// Outcome of one detection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub found: bool,
    pub centroid_rectified: Option<Point2D>,
    /// Filled in by [`DetectionResult::with_full_frame`]
    pub centroid_full_frame: Option<Point2D>,
    /// Area of the largest region, reported even when it was rejected
    pub area: f64,
    pub bounding_box: Option<BoundingBox>,
    /// Regions left after cleanup
    pub region_count: usize,
    /// Share of pixels above threshold before cleanup, `0.0..=1.0`
    pub foreground_fraction: f64,
}

impl DetectionResult {
    fn miss(area: f64, region_count: usize, foreground_fraction: f64) -> Self {
        Self {
            found: false,
            centroid_rectified: None,
            centroid_full_frame: None,
            area,
            bounding_box: None,
            region_count,
            foreground_fraction,
        }
    }

    /// Map the rectified centroid back to full-frame pixels.
    pub fn with_full_frame(mut self, transform: &RectifyTransform) -> Self {
        self.centroid_full_frame = self.centroid_rectified.map(|c| transform.to_full_frame(c));
        self
    }
}

/// A strategy for locating the object on a rectified tray frame.
pub trait ObjectDetector: Send {
    /// Compare `live` against `reference`. Both must already be rectified
    /// onto the same canvas.
    fn detect(&self, reference: &Frame, live: &Frame) -> Result<DetectionResult, DetectionError>;

    fn name(&self) -> &'static str;
}

/// Build the detector selected by `config.strategy`, optionally restricted
/// to `mask`.
pub fn build_detector(config: &DetectorConfig, mask: Option<Array2<bool>>) -> Box<dyn ObjectDetector> {
    match config.strategy {
        DetectionStrategy::Difference => {
            let detector = DifferenceDetector::new(config.clone());
            Box::new(match mask {
                Some(m) => detector.with_mask(m),
                None => detector,
            })
        }
        DetectionStrategy::ColorRange => {
            let detector = ColorRangeDetector::new(config.clone());
            Box::new(match mask {
                Some(m) => detector.with_mask(m),
                None => detector,
            })
        }
        DetectionStrategy::Edges => {
            let detector = EdgeDetector::new(config.clone());
            Box::new(match mask {
                Some(m) => detector.with_mask(m),
                None => detector,
            })
        }
    }
}

fn check_geometry(
    reference: &Frame,
    live: &Frame,
    mask: Option<&Array2<bool>>,
) -> Result<(), DetectionError> {
    let (reference, live) = (reference.size(), live.size());
    if reference != live {
        return Err(DetectionError::GeometryMismatch { reference, live });
    }
    if let Some(mask) = mask {
        let (rows, cols) = mask.dim();
        let mask = ImageSize::from_width_height(cols, rows);
        if mask != live {
            return Err(DetectionError::MaskMismatch { mask, frame: live });
        }
    }
    Ok(())
}

/// Region selection shared by all strategies.
fn select_region(
    mut foreground: Array2<bool>,
    mask: Option<&Array2<bool>>,
    config: &DetectorConfig,
) -> DetectionResult {
    if let Some(mask) = mask {
        foreground.zip_mut_with(mask, |f, &m| *f &= m);
    }
    let total = foreground.len().max(1) as f64;
    let fraction = foreground.iter().filter(|&&v| v).count() as f64 / total;

    let mut cleaned = foreground;
    if config.morph_kernel > 1 {
        cleaned = open(cleaned.view(), config.morph_kernel);
        cleaned = close(cleaned.view(), config.morph_kernel);
    }
    if config.dilation_iterations > 0 {
        cleaned = dilate(cleaned.view(), config.dilate_kernel, config.dilation_iterations);
    }
    let filled = fill_holes(cleaned.view());

    let (labels, count) = connected_components(filled.view());
    let regions = extract_regions(labels.view(), count);

    let Some(largest) = regions
        .iter()
        .reduce(|best, r| if r.area() > best.area() { r } else { best })
    else {
        debug!("No foreground regions ({:.2}% above threshold)", fraction * 100.0);
        return DetectionResult::miss(0.0, 0, fraction);
    };

    let area = largest.area();
    if area < config.min_area {
        debug!(
            "Largest of {} regions has area {area:.0} < {:.0}",
            regions.len(),
            config.min_area
        );
        return DetectionResult::miss(area, regions.len(), fraction);
    }

    let Some(centroid) = largest.centroid() else {
        return DetectionResult::miss(area, regions.len(), fraction);
    };

    debug!(
        "Detected region area {area:.0} at {centroid} among {} regions",
        regions.len()
    );
    DetectionResult {
        found: true,
        centroid_rectified: Some(centroid),
        centroid_full_frame: None,
        area,
        bounding_box: Some(largest.bounding_box),
        region_count: regions.len(),
        foreground_fraction: fraction,
    }
}
