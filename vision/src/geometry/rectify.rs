use tracing::debug;

use super::{GeometryError, Homography, OrderedCorners, Point2D, TrayCorners};
use crate::frame::Frame;
use crate::image_size::ImageSize;

/// Perspective mapping between full-frame pixels and the rectified tray canvas.
///
/// Built once per session from the tray corners. The ordered corners map to
/// `(0, 0)`, `(w-1, 0)`, `(w-1, h-1)` and `(0, h-1)` of a `w x h` canvas,
/// where the canvas size comes from [`OrderedCorners::canvas_size`].
/// Pixel centers sit on integer coordinates in both spaces.
///
/// # Example
///
/// ```
/// use vision::{Point2D, RectifyTransform, TrayCorners};
///
/// let corners = TrayCorners::new(&[
///     Point2D::new(100.0, 50.0),
///     Point2D::new(500.0, 60.0),
///     Point2D::new(520.0, 420.0),
///     Point2D::new(90.0, 400.0),
/// ])?;
/// let transform = RectifyTransform::from_corners(&corners)?;
///
/// let p = Point2D::new(300.0, 240.0);
/// let back = transform.to_full_frame(transform.to_rectified(p));
/// assert!((back.x - p.x).abs() < 1e-6 && (back.y - p.y).abs() < 1e-6);
/// # Ok::<(), vision::GeometryError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RectifyTransform {
    corners: OrderedCorners,
    canvas: ImageSize,
    forward: Homography,
    inverse: Homography,
}

impl RectifyTransform {
    pub fn from_corners(corners: &TrayCorners) -> Result<Self, GeometryError> {
        let ordered = corners.order()?;
        let canvas = ordered.canvas_size();
        let (w, h) = ((canvas.width - 1) as f64, (canvas.height - 1) as f64);
        let dst = [
            Point2D::new(0.0, 0.0),
            Point2D::new(w, 0.0),
            Point2D::new(w, h),
            Point2D::new(0.0, h),
        ];

        let forward = Homography::from_4pt(&ordered.as_array(), &dst)
            .ok_or(GeometryError::SingularTransform)?;
        let inverse = forward.inverse().ok_or(GeometryError::SingularTransform)?;

        debug!(
            "Rectify transform: TL {} TR {} BR {} BL {} -> canvas {}",
            ordered.top_left, ordered.top_right, ordered.bottom_right, ordered.bottom_left, canvas
        );

        Ok(Self {
            corners: ordered,
            canvas,
            forward,
            inverse,
        })
    }

    pub fn canvas_size(&self) -> ImageSize {
        self.canvas
    }

    pub fn corners(&self) -> &OrderedCorners {
        &self.corners
    }

    pub fn to_rectified(&self, p: Point2D) -> Point2D {
        self.forward.apply(p)
    }

    pub fn to_full_frame(&self, p: Point2D) -> Point2D {
        self.inverse.apply(p)
    }

    /// Resample a full frame onto the rectified canvas.
    ///
    /// Each canvas pixel is pulled back through the inverse transform and
    /// bilinearly sampled per channel. Canvas pixels whose source falls
    /// outside the frame are black.
    pub fn warp_frame(&self, frame: &Frame) -> Frame {
        let mut out = Frame::filled(self.canvas, [0, 0, 0]);
        for y in 0..self.canvas.height {
            for x in 0..self.canvas.width {
                let src = self.to_full_frame(Point2D::new(x as f64, y as f64));
                if let Some(rgb) = sample_bilinear(frame, src) {
                    out.set_pixel(x, y, rgb);
                }
            }
        }
        out
    }
}

/// Sub-pixel tolerance for samples landing just past the last row or column.
const EDGE_SLACK: f64 = 1e-6;

fn sample_bilinear(frame: &Frame, p: Point2D) -> Option<[u8; 3]> {
    let size = frame.size();
    let max_x = (size.width - 1) as f64;
    let max_y = (size.height - 1) as f64;
    if !p.is_finite()
        || p.x < -EDGE_SLACK
        || p.y < -EDGE_SLACK
        || p.x > max_x + EDGE_SLACK
        || p.y > max_y + EDGE_SLACK
    {
        return None;
    }

    let x = p.x.clamp(0.0, max_x);
    let y = p.y.clamp(0.0, max_y);
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(size.width - 1);
    let y1 = (y0 + 1).min(size.height - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let (p00, p10) = (frame.pixel(x0, y0), frame.pixel(x1, y0));
    let (p01, p11) = (frame.pixel(x0, y1), frame.pixel(x1, y1));

    let mut rgb = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f64 + fx * (p10[c] as f64 - p00[c] as f64);
        let bottom = p01[c] as f64 + fx * (p11[c] as f64 - p01[c] as f64);
        rgb[c] = (top + fy * (bottom - top)).round().clamp(0.0, 255.0) as u8;
    }
    Some(rgb)
}
