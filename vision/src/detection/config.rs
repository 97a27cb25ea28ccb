use serde::{Deserialize, Serialize};

/// Which detector implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStrategy {
    /// Difference against the empty-tray reference
    #[default]
    Difference,
    /// Static HSV color thresholding, reference unused
    ColorRange,
    /// Filled Canny outlines, reference unused
    Edges,
}

/// Inclusive HSV bounds, hue in `0..180`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl Default for HsvRange {
    fn default() -> Self {
        Self {
            lower: [0, 50, 50],
            upper: [179, 255, 255],
        }
    }
}

/// Gaussian pre-blur applied to intensity images before differencing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlurConfig {
    /// Kernel side length, odd
    pub kernel_size: usize,
    /// Standard deviation; zero derives it from the kernel size
    pub sigma: f64,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            kernel_size: 5,
            sigma: 0.0,
        }
    }
}

/// Hysteresis bounds on gradient magnitude for the Canny pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CannyThresholds {
    pub low: f32,
    pub high: f32,
}

impl Default for CannyThresholds {
    fn default() -> Self {
        Self { low: 50.0, high: 150.0 }
    }
}

/// Detector tunables.
///
/// Defaults are the values the rig was commissioned with: a difference
/// threshold of 50, a 225 px minimum region, 5x5 open/close cleanup, and
/// five 3x3 dilations to merge fragments of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub strategy: DetectionStrategy,
    /// Intensity difference a pixel must exceed to count as foreground
    pub threshold: u8,
    /// Smallest accepted region area in rectified pixels
    pub min_area: f64,
    pub blur: Option<BlurConfig>,
    /// Open/close element size; 0 or 1 disables cleanup
    pub morph_kernel: usize,
    pub dilate_kernel: usize,
    pub dilation_iterations: usize,
    /// Bounds for [`DetectionStrategy::ColorRange`]
    pub hsv: HsvRange,
    /// Bounds for [`DetectionStrategy::Edges`]
    pub canny: CannyThresholds,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            strategy: DetectionStrategy::Difference,
            threshold: 50,
            min_area: 225.0,
            blur: None,
            morph_kernel: 5,
            dilate_kernel: 3,
            dilation_iterations: 5,
            hsv: HsvRange::default(),
            canny: CannyThresholds::default(),
        }
    }
}
