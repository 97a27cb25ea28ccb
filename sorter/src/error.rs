use hardware::{CaptureError, LinkError};
use thiserror::Error;
use vision::{DetectionError, GeometryError};

use crate::calibration::CalibrationError;

/// Failures surfaced by a sorting session.
///
/// `GeometryInvalid` and `CalibrationDegenerate` abort startup. The device
/// and communication kinds abort startup only when they happen before the
/// first cycle; inside the loop they become cycle outcomes instead.
#[derive(Error, Debug)]
pub enum SorterError {
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(#[from] CaptureError),

    #[error("actuator communication failed: {0}")]
    CommunicationFailure(#[from] LinkError),

    #[error("calibration is degenerate: {0}")]
    CalibrationDegenerate(#[from] CalibrationError),

    #[error("tray geometry is invalid: {0}")]
    GeometryInvalid(#[from] GeometryError),

    #[error("detection failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("configuration error: {0}")]
    Config(#[from] std::io::Error),

    /// The operator declined to confirm an empty tray.
    #[error("aborted by operator before the reference capture")]
    Aborted,
}

pub type Result<T> = std::result::Result<T, SorterError>;
