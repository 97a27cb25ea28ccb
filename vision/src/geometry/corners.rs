use std::cmp::Ordering;

use super::{GeometryError, Point2D};
use crate::image_size::ImageSize;

/// Relative tolerance for the collinearity test, scaled by the squared
/// extent of the corner set.
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// Unordered tray boundary in full-frame pixel space.
///
/// Construction checks that there are exactly four finite, distinct corners
/// and that no three of them are collinear. Whether they form a simple
/// quadrilateral is only known once they are ordered, see [`TrayCorners::order`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrayCorners {
    points: [Point2D; 4],
}

impl TrayCorners {
    pub fn new(points: &[Point2D]) -> Result<Self, GeometryError> {
        let points: [Point2D; 4] = points
            .try_into()
            .map_err(|_| GeometryError::CornerCount(points.len()))?;

        if let Some(p) = points.iter().find(|p| !p.is_finite()) {
            return Err(GeometryError::NonFinite(*p));
        }

        for i in 0..4 {
            for j in (i + 1)..4 {
                if points[i] == points[j] {
                    return Err(GeometryError::DuplicateCorner(points[i]));
                }
            }
        }

        let extent = points
            .iter()
            .flat_map(|a| points.iter().map(move |b| a.distance_to(b)))
            .fold(1.0_f64, f64::max);
        let tolerance = COLLINEAR_TOLERANCE * extent * extent;
        for (a, b, c) in [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)] {
            if points[a].cross(&points[b], &points[c]).abs() <= tolerance {
                return Err(GeometryError::Collinear(points[a], points[b], points[c]));
            }
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point2D; 4] {
        &self.points
    }

    /// Canonical (top-left, top-right, bottom-right, bottom-left) ordering.
    ///
    /// The corner with the smallest `x + y` is top-left and the largest is
    /// bottom-right. Of the remaining two, the one with the smaller `y - x`
    /// is top-right. Ties in either key are broken on the coordinates
    /// themselves so any permutation of the input yields the same result.
    ///
    /// Fails if the ordered quadrilateral self-intersects or winds backwards,
    /// both of which mean the corners did not come from a tray viewed
    /// roughly square-on.
    pub fn order(&self) -> Result<OrderedCorners, GeometryError> {
        let mut sorted = self.points;
        sorted.sort_by(|a, b| {
            (a.x + a.y)
                .total_cmp(&(b.x + b.y))
                .then(a.x.total_cmp(&b.x))
                .then(a.y.total_cmp(&b.y))
        });

        let (mid_a, mid_b) = (sorted[1], sorted[2]);
        let a_first = match (mid_a.y - mid_a.x).total_cmp(&(mid_b.y - mid_b.x)) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => mid_a.x > mid_b.x,
        };
        let (top_right, bottom_left) = if a_first {
            (mid_a, mid_b)
        } else {
            (mid_b, mid_a)
        };

        let ordered = OrderedCorners {
            top_left: sorted[0],
            top_right,
            bottom_right: sorted[3],
            bottom_left,
        };
        ordered.validate()?;
        Ok(ordered)
    }
}

/// Tray corners in (top-left, top-right, bottom-right, bottom-left) order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderedCorners {
    pub top_left: Point2D,
    pub top_right: Point2D,
    pub bottom_right: Point2D,
    pub bottom_left: Point2D,
}

impl OrderedCorners {
    pub fn as_array(&self) -> [Point2D; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Rectified canvas size: the longer of each pair of opposite edges,
    /// rounded down and never below one pixel.
    pub fn canvas_size(&self) -> ImageSize {
        let width = self
            .top_left
            .distance_to(&self.top_right)
            .max(self.bottom_left.distance_to(&self.bottom_right));
        let height = self
            .top_left
            .distance_to(&self.bottom_left)
            .max(self.top_right.distance_to(&self.bottom_right));
        ImageSize::from_width_height((width.floor() as usize).max(1), (height.floor() as usize).max(1))
    }

    /// Shoelace area; positive for clockwise winding in image coordinates.
    pub fn signed_area(&self) -> f64 {
        let p = self.as_array();
        let twice: f64 = (0..4)
            .map(|i| {
                let (a, b) = (p[i], p[(i + 1) % 4]);
                a.x * b.y - b.x * a.y
            })
            .sum();
        twice / 2.0
    }

    fn validate(&self) -> Result<(), GeometryError> {
        if segments_cross(
            (self.top_left, self.top_right),
            (self.bottom_right, self.bottom_left),
        ) || segments_cross(
            (self.top_right, self.bottom_right),
            (self.bottom_left, self.top_left),
        ) {
            return Err(GeometryError::SelfIntersecting);
        }
        if self.signed_area() <= 0.0 {
            return Err(GeometryError::Mirrored);
        }
        Ok(())
    }
}

/// Proper intersection of two segments. Touching endpoints do not count.
fn segments_cross(s1: (Point2D, Point2D), s2: (Point2D, Point2D)) -> bool {
    let d1 = s1.0.cross(&s1.1, &s2.0);
    let d2 = s1.0.cross(&s1.1, &s2.1);
    let d3 = s2.0.cross(&s2.1, &s1.0);
    let d4 = s2.0.cross(&s2.1, &s1.1);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}
