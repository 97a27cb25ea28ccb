//! Tray geometry: corner ordering and perspective rectification.

mod corners;
mod homography;
mod point;
mod rectify;

pub use corners::{OrderedCorners, TrayCorners};
pub use homography::Homography;
pub use point::Point2D;
pub use rectify::RectifyTransform;

use thiserror::Error;

/// Errors raised while validating tray corners or building the transform.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("expected exactly 4 tray corners, got {0}")]
    CornerCount(usize),

    #[error("tray corner {0} is not a finite coordinate")]
    NonFinite(Point2D),

    #[error("tray corner {0} appears more than once")]
    DuplicateCorner(Point2D),

    #[error("tray corners {0}, {1} and {2} are collinear")]
    Collinear(Point2D, Point2D, Point2D),

    /// Opposite edges of the ordered quadrilateral cross each other.
    #[error("tray corners do not form a simple quadrilateral")]
    SelfIntersecting,

    /// Ordered corners wind the wrong way, which means the
    /// top-left/top-right assignment was mirrored.
    #[error("tray corners order into a mirrored quadrilateral")]
    Mirrored,

    #[error("perspective transform is singular")]
    SingularTransform,
}
