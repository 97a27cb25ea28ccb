//! Image dimensions

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width and height of a frame or rectified canvas in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
}

impl ImageSize {
    pub fn from_width_height(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Total number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Shape tuple in ndarray row-major order: (rows, cols).
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// All-false mask with this size.
    pub fn empty_mask(&self) -> Array2<bool> {
        Array2::from_elem(self.shape(), false)
    }

    /// True if (x, y) addresses a pixel inside this size.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
