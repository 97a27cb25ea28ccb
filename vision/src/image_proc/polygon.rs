//! Polygon rasterization for restricting processing to the tray.

use ndarray::Array2;

use crate::geometry::Point2D;
use crate::image_size::ImageSize;

/// Mask of pixels whose centers lie inside `polygon` (even-odd rule).
///
/// Pixel `(x, y)` is tested at the integer coordinate `(x, y)`. Fewer than
/// three vertices produce an empty mask.
pub fn polygon_mask(size: ImageSize, polygon: &[Point2D]) -> Array2<bool> {
    if polygon.len() < 3 {
        return size.empty_mask();
    }
    Array2::from_shape_fn(size.shape(), |(y, x)| {
        contains(polygon, Point2D::new(x as f64, y as f64))
    })
}

fn contains(polygon: &[Point2D], p: Point2D) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
