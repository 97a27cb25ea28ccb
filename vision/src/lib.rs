//! Vision pipeline for the sorting arm.
//!
//! Frames arrive from the camera in full-frame pixel space. The [`geometry`]
//! module rectifies the tray quadrilateral into a fixed rectangular canvas,
//! [`detection`] compares a rectified live frame against the empty-tray
//! reference, and the resulting centroid is mapped back to full-frame pixels
//! for the motion calibration.
//!
//! The [`image_proc`] module holds the pixel-level primitives (grayscale and
//! HSV conversion, blur, threshold, morphology, region labelling) that the
//! detectors are assembled from.

pub mod detection;
pub mod frame;
pub mod geometry;
pub mod image_proc;
pub mod image_size;

pub use detection::{
    build_detector, BlurConfig, CannyThresholds, ColorRangeDetector, DetectionError, DetectionResult,
    DetectionStrategy, DetectorConfig, DifferenceDetector, EdgeDetector, HsvRange, ObjectDetector,
};
pub use frame::Frame;
pub use geometry::{
    GeometryError, Homography, OrderedCorners, Point2D, RectifyTransform, TrayCorners,
};
pub use image_proc::BoundingBox;
pub use image_size::ImageSize;
