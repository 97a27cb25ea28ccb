use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

use super::Point2D;

/// Planar projective transform `dst ~ H * src`, normalized so `h[(2, 2)] == 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    /// Map a point. Points on the line at infinity come back non-finite.
    #[inline]
    pub fn apply(&self, p: Point2D) -> Point2D {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point2D::new(v[0] / v[2], v[1] / v[2])
    }

    pub fn inverse(&self) -> Option<Self> {
        let inv = self.h.try_inverse()?;
        normalize(inv).map(Self::new)
    }

    /// Exact homography from four point correspondences.
    ///
    /// Both point sets are Hartley-normalized before solving the 8x8 linear
    /// system, which keeps the solve well conditioned for pixel-scale input.
    /// Returns `None` when the correspondences are degenerate.
    pub fn from_4pt(src: &[Point2D; 4], dst: &[Point2D; 4]) -> Option<Self> {
        // Unknowns: [h11 h12 h13 h21 h22 h23 h31 h32], with h33 = 1
        let (src_n, t_src) = normalize_points(src);
        let (dst_n, t_dst) = normalize_points(dst);

        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for k in 0..4 {
            let (x, y) = (src_n[k].x, src_n[k].y);
            let (u, v) = (dst_n[k].x, dst_n[k].y);

            let r0 = 2 * k;
            a[(r0, 0)] = x;
            a[(r0, 1)] = y;
            a[(r0, 2)] = 1.0;
            a[(r0, 6)] = -u * x;
            a[(r0, 7)] = -u * y;
            b[r0] = u;

            let r1 = 2 * k + 1;
            a[(r1, 3)] = x;
            a[(r1, 4)] = y;
            a[(r1, 5)] = 1.0;
            a[(r1, 6)] = -v * x;
            a[(r1, 7)] = -v * y;
            b[r1] = v;
        }

        let x = a.lu().solve(&b)?;
        let hn = Matrix3::new(
            x[0], x[1], x[2], //
            x[3], x[4], x[5], //
            x[6], x[7], 1.0,
        );

        // H = T_dst^-1 * Hn * T_src
        let h = t_dst.try_inverse()? * hn * t_src;
        let h = normalize(h)?;
        if h.iter().all(|v| v.is_finite()) {
            Some(Self::new(h))
        } else {
            None
        }
    }
}

fn normalize(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    Some(h / s)
}

/// Translate to the centroid and scale so the mean distance is sqrt(2).
fn normalize_points(pts: &[Point2D; 4]) -> ([Point2D; 4], Matrix3<f64>) {
    let cx = pts.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = pts.iter().map(|p| p.y).sum::<f64>() / 4.0;
    let mean_dist = pts
        .iter()
        .map(|p| (p.x - cx).hypot(p.y - cy))
        .sum::<f64>()
        / 4.0;

    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);

    let mut out = [Point2D::default(); 4];
    for (o, p) in out.iter_mut().zip(pts) {
        *o = Point2D::new(s * (p.x - cx), s * (p.y - cy));
    }
    (out, t)
}
