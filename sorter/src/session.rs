//! Session-scoped ownership of the rig hardware.
//!
//! A [`Session`] is the only holder of the camera and the actuator link for
//! one run. Both are acquired in [`Session::start`] and released when the
//! session is dropped, whether the run ended normally, was cancelled, or
//! failed part way through startup.

use std::ops::{Deref, DerefMut};

use hardware::{CaptureDevice, CommandDispatcher, LinkConnector};
use tracing::{debug, info};
use vision::{
    build_detector, DetectionResult, Frame, ObjectDetector, Point2D, RectifyTransform, TrayCorners,
};

use crate::calibration::{CalibrationModel, MotionPlan};
use crate::config::SorterConfig;
use crate::error::{Result, SorterError};

/// Releases the wrapped camera when dropped.
struct CameraHandle(Box<dyn CaptureDevice>);

impl Deref for CameraHandle {
    type Target = dyn CaptureDevice;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl DerefMut for CameraHandle {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut()
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// One rectified live frame and what was found on it.
#[derive(Debug, Clone)]
pub struct Scan {
    pub frame: Frame,
    pub detection: DetectionResult,
}

/// Hardware, geometry, calibration and reference frame for one run.
pub struct Session {
    config: SorterConfig,
    transform: RectifyTransform,
    calibration: CalibrationModel,
    detector: Box<dyn ObjectDetector>,
    reference: Frame,
    camera: CameraHandle,
    dispatcher: CommandDispatcher,
}

impl Session {
    /// Validate the configuration, open the hardware, and capture the
    /// empty-tray reference.
    ///
    /// Geometry and calibration are checked before any hardware is touched.
    /// `confirm_empty_tray` runs after the actuator link is open and before
    /// the reference is captured, giving the operator a chance to clear the
    /// tray. Returning `false` aborts startup without reading the camera.
    ///
    /// # Errors
    ///
    /// - [`SorterError::GeometryInvalid`](crate::SorterError::GeometryInvalid) for bad tray corners
    /// - [`SorterError::CalibrationDegenerate`](crate::SorterError::CalibrationDegenerate) for an underdetermined fit
    /// - [`SorterError::CommunicationFailure`](crate::SorterError::CommunicationFailure) if the link will not open
    /// - [`SorterError::DeviceUnavailable`](crate::SorterError::DeviceUnavailable) if the reference capture fails
    /// - [`SorterError::Aborted`](crate::SorterError::Aborted) if the operator declines
    ///
    /// The camera is released and the link closed on every error path.
    pub fn start(
        config: SorterConfig,
        camera: Box<dyn CaptureDevice>,
        connector: Box<dyn LinkConnector>,
        confirm_empty_tray: impl FnOnce() -> bool,
    ) -> Result<Self> {
        let mut camera = CameraHandle(camera);
        let mut dispatcher = CommandDispatcher::new(connector, config.link.timing());

        let corners = TrayCorners::new(&config.tray.corners)?;
        let transform = RectifyTransform::from_corners(&corners)?;
        let calibration = CalibrationModel::fit(&config.calibration)?;
        info!(
            "Calibration X: {:.5} * px + {:.3} (R² {:.3}), Y: {:.5} * px + {:.3} (R² {:.3})",
            calibration.x.slope,
            calibration.x.intercept,
            calibration.x.r_squared,
            calibration.y.slope,
            calibration.y.intercept,
            calibration.y.r_squared
        );

        let detector = build_detector(&config.detector, None);
        info!(
            "Tray rectified to {} canvas, {} detector",
            transform.canvas_size(),
            detector.name()
        );

        dispatcher.open()?;

        if !confirm_empty_tray() {
            info!("Operator aborted before the reference capture");
            return Err(SorterError::Aborted);
        }
        let reference = transform.warp_frame(&camera.read_frame()?);
        info!("Captured empty-tray reference from {}", camera.description());

        Ok(Self {
            config,
            transform,
            calibration,
            detector,
            reference,
            camera,
            dispatcher,
        })
    }

    /// Capture a fresh empty-tray reference, replacing the current one.
    ///
    /// The old reference is kept if the capture fails.
    pub fn recapture_reference(&mut self) -> Result<()> {
        let frame = self.camera.read_frame()?;
        self.reference = self.transform.warp_frame(&frame);
        info!("Re-captured empty-tray reference");
        Ok(())
    }

    /// Capture, rectify and run detection on one live frame.
    pub fn scan(&mut self) -> Result<Scan> {
        let live = self.transform.warp_frame(&self.camera.read_frame()?);
        let detection = self
            .detector
            .detect(&self.reference, &live)?
            .with_full_frame(&self.transform);
        debug!(
            "Scan: found={} area={:.0} regions={} changed={:.2}%",
            detection.found,
            detection.area,
            detection.region_count,
            detection.foreground_fraction * 100.0
        );
        Ok(Scan {
            frame: live,
            detection,
        })
    }

    pub fn plan(&self, target: Point2D) -> MotionPlan {
        self.calibration.plan(target)
    }

    pub fn config(&self) -> &SorterConfig {
        &self.config
    }

    pub fn transform(&self) -> &RectifyTransform {
        &self.transform
    }

    pub fn reference(&self) -> &Frame {
        &self.reference
    }

    pub fn dispatcher(&mut self) -> &mut CommandDispatcher {
        &mut self.dispatcher
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dispatcher.close();
        self.camera.release();
        info!("Session closed, hardware released");
    }
}
