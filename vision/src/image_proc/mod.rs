//! Pixel-level image processing primitives.
//!
//! All masks are `Array2<bool>` and all intensity images `Array2<u8>`, indexed
//! `[[row, col]]`.

pub mod blur;
pub mod color;
pub mod morphology;
pub mod polygon;
pub mod regions;
pub mod thresholding;

pub use blur::{gaussian_blur, gaussian_kernel};
pub use morphology::{close, dilate, erode, open};
pub use polygon::polygon_mask;
pub use regions::{extract_regions, BoundingBox, Region};
pub use thresholding::{abs_diff, apply_threshold, connected_components, fill_holes, in_range};
