//! Region statistics over a labelled mask.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::geometry::Point2D;

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left column
    pub x_min: usize,
    /// Top row
    pub y_min: usize,
    pub width: usize,
    pub height: usize,
}

impl BoundingBox {
    pub fn new(x_min: usize, y_min: usize, width: usize, height: usize) -> Self {
        Self {
            x_min,
            y_min,
            width,
            height,
        }
    }

    /// One past the right column
    pub fn x_max(&self) -> usize {
        self.x_min + self.width
    }

    /// One past the bottom row
    pub fn y_max(&self) -> usize {
        self.y_min + self.height
    }
}

/// One connected region with its raw spatial moments.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub label: u32,
    /// Zeroth moment, the pixel count
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub bounding_box: BoundingBox,
}

impl Region {
    pub fn area(&self) -> f64 {
        self.m00
    }

    /// `(m10 / m00, m01 / m00)`, or `None` for a zero-area region.
    pub fn centroid(&self) -> Option<Point2D> {
        if self.m00 <= 0.0 {
            return None;
        }
        Some(Point2D::new(self.m10 / self.m00, self.m01 / self.m00))
    }
}

/// Accumulate moments and bounds for labels `1..=count`.
///
/// Regions are returned in label order.
pub fn extract_regions(labels: ArrayView2<u32>, count: u32) -> Vec<Region> {
    struct Acc {
        m00: f64,
        m10: f64,
        m01: f64,
        x_min: usize,
        y_min: usize,
        x_max: usize,
        y_max: usize,
    }

    let mut acc: Vec<Acc> = (0..count)
        .map(|_| Acc {
            m00: 0.0,
            m10: 0.0,
            m01: 0.0,
            x_min: usize::MAX,
            y_min: usize::MAX,
            x_max: 0,
            y_max: 0,
        })
        .collect();

    for ((y, x), &label) in labels.indexed_iter() {
        if label == 0 || label > count {
            continue;
        }
        let a = &mut acc[(label - 1) as usize];
        a.m00 += 1.0;
        a.m10 += x as f64;
        a.m01 += y as f64;
        a.x_min = a.x_min.min(x);
        a.y_min = a.y_min.min(y);
        a.x_max = a.x_max.max(x);
        a.y_max = a.y_max.max(y);
    }

    acc.into_iter()
        .enumerate()
        .filter(|(_, a)| a.m00 > 0.0)
        .map(|(i, a)| Region {
            label: i as u32 + 1,
            m00: a.m00,
            m10: a.m10,
            m01: a.m01,
            bounding_box: BoundingBox::new(
                a.x_min,
                a.y_min,
                a.x_max - a.x_min + 1,
                a.y_max - a.y_min + 1,
            ),
        })
        .collect()
}
