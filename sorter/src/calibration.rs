//! Pixel-to-travel-time calibration.
//!
//! Each horizontal axis is modelled as a straight line from full-frame pixel
//! coordinate to actuator run time, fitted by ordinary least squares over a
//! handful of observations taken on the rig. The model is approximate and
//! must be refitted whenever the camera or arm moves.

use ndarray::Array1;
use thiserror::Error;
use vision::Point2D;

use crate::config::{CalibrationConfig, CalibrationPoint};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Fewer than two distinct pixel values; the slope is undefined.
    #[error("{axis} axis calibration needs at least 2 distinct pixel values, got {distinct}")]
    Degenerate { axis: &'static str, distinct: usize },

    #[error("{axis} axis calibration contains a non-finite value")]
    NonFinite { axis: &'static str },
}

/// Straight-line fit `seconds = slope * pixel + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination (R²), 0.0 to 1.0
    pub r_squared: f64,
    pub num_points: usize,
}

impl LinearFit {
    /// Unclamped line value.
    pub fn raw(&self, pixel: f64) -> f64 {
        self.slope * pixel + self.intercept
    }

    /// Predicted travel time, floored at zero.
    pub fn predict(&self, pixel: f64) -> f64 {
        self.raw(pixel).max(0.0)
    }
}

/// Fit one axis by ordinary least squares.
pub fn fit_line(axis: &'static str, points: &[CalibrationPoint]) -> Result<LinearFit, CalibrationError> {
    if points
        .iter()
        .any(|p| !p.pixel.is_finite() || !p.seconds.is_finite())
    {
        return Err(CalibrationError::NonFinite { axis });
    }

    let mut pixels: Vec<f64> = points.iter().map(|p| p.pixel).collect();
    pixels.sort_by(f64::total_cmp);
    pixels.dedup();
    if pixels.len() < 2 {
        return Err(CalibrationError::Degenerate {
            axis,
            distinct: pixels.len(),
        });
    }

    let x = Array1::from_iter(points.iter().map(|p| p.pixel));
    let y = Array1::from_iter(points.iter().map(|p| p.seconds));
    let x_mean = x.mean().unwrap_or(0.0);
    let y_mean = y.mean().unwrap_or(0.0);
    let dx = &x - x_mean;
    let dy = &y - y_mean;

    let sxx = (&dx * &dx).sum();
    if sxx <= f64::EPSILON {
        return Err(CalibrationError::Degenerate {
            axis,
            distinct: pixels.len(),
        });
    }
    let slope = (&dx * &dy).sum() / sxx;
    let intercept = y_mean - slope * x_mean;

    let residuals = &y - &x.mapv(|v| slope * v + intercept);
    let ss_res = (&residuals * &residuals).sum();
    let ss_tot = (&dy * &dy).sum();
    let r_squared = if ss_tot > f64::EPSILON {
        1.0 - ss_res / ss_tot
    } else {
        1.0
    };

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
        num_points: points.len(),
    })
}

/// Per-axis travel times for one pick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionPlan {
    pub x_seconds: f64,
    pub y_seconds: f64,
}

/// Both axis fits, computed once at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationModel {
    pub x: LinearFit,
    pub y: LinearFit,
}

impl CalibrationModel {
    pub fn fit(config: &CalibrationConfig) -> Result<Self, CalibrationError> {
        Ok(Self {
            x: fit_line("X", &config.x)?,
            y: fit_line("Y", &config.y)?,
        })
    }

    /// Travel times to reach a full-frame pixel position. Both are `>= 0`.
    pub fn plan(&self, target: Point2D) -> MotionPlan {
        MotionPlan {
            x_seconds: self.x.predict(target.x),
            y_seconds: self.y.predict(target.y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn points(raw: &[(f64, f64)]) -> Vec<CalibrationPoint> {
        raw.iter().map(|&(p, s)| CalibrationPoint::new(p, s)).collect()
    }

    #[test]
    fn bench_calibration_data() {
        let fit = fit_line(
            "X",
            &points(&[(454.0, 0.0), (239.0, 1.0), (330.0, 1.0), (542.0, 0.0)]),
        )
        .unwrap();

        assert_relative_eq!(fit.slope, -213.5 / 53594.75, epsilon = 1e-12);
        assert_relative_eq!(fit.predict(239.0), 1.0, epsilon = 0.3);
        assert_relative_eq!(fit.predict(454.0), 0.0, epsilon = 0.3);
        assert_eq!(fit.num_points, 4);
    }

    #[test]
    fn exact_line_is_recovered() {
        let fit = fit_line("Y", &points(&[(0.0, 1.0), (10.0, 3.0), (20.0, 5.0)])).unwrap();
        assert_relative_eq!(fit.slope, 0.2, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 1.0, epsilon = 1e-12);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn predictions_are_never_negative() {
        let fit = fit_line(
            "X",
            &points(&[(454.0, 0.0), (239.0, 1.0), (330.0, 1.0), (542.0, 0.0)]),
        )
        .unwrap();
        for pixel in [-1e6, 0.0, 454.0, 542.0, 1000.0, 1e9] {
            assert!(fit.predict(pixel) >= 0.0, "pixel {pixel}");
        }
        assert!(fit.raw(1000.0) < 0.0);
        assert_eq!(fit.predict(1000.0), 0.0);
    }

    #[test]
    fn single_distinct_pixel_is_degenerate() {
        let err = fit_line("X", &points(&[(300.0, 0.0), (300.0, 1.0), (300.0, 2.0)])).unwrap_err();
        assert_eq!(err, CalibrationError::Degenerate { axis: "X", distinct: 1 });

        let err = fit_line("Y", &[]).unwrap_err();
        assert_eq!(err, CalibrationError::Degenerate { axis: "Y", distinct: 0 });
    }

    #[test]
    fn non_finite_samples_rejected() {
        let err = fit_line("X", &points(&[(1.0, 0.0), (f64::INFINITY, 1.0)])).unwrap_err();
        assert_eq!(err, CalibrationError::NonFinite { axis: "X" });
    }

    #[test]
    fn default_rig_model_plans_inside_tray() {
        let model = CalibrationModel::fit(&CalibrationConfig::default()).unwrap();
        // x falls with pixel, y rises with pixel
        assert!(model.x.slope < 0.0);
        assert!(model.y.slope > 0.0);

        let plan = model.plan(Point2D::new(300.0, 250.0));
        assert!(plan.x_seconds > 0.0 && plan.x_seconds < 1.2);
        assert!(plan.y_seconds > 0.4 && plan.y_seconds < 4.2);
    }
}
