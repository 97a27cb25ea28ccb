//! Frame capture devices.
//!
//! The control loop holds one [`CaptureDevice`] for the whole session and
//! calls [`CaptureDevice::release`] on every exit path. Implementations must
//! tolerate repeated `release` calls.

mod mock;
mod still;
#[cfg(all(target_os = "linux", feature = "v4l2"))]
mod v4l2;

pub use mock::{CameraProbe, ScriptedCamera};
pub use still::ImageFileCamera;
#[cfg(all(target_os = "linux", feature = "v4l2"))]
pub use v4l2::{V4l2Camera, V4l2Config};

use thiserror::Error;
use vision::Frame;

/// Capture failures. Both are fatal to the operation that hit them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// Device could not be opened, or was already released.
    #[error("capture device {device} is not open: {reason}")]
    NotOpened { device: String, reason: String },

    /// Device is open but did not deliver a frame.
    #[error("capture device {device} did not return a frame: {reason}")]
    FrameNotRead { device: String, reason: String },
}

/// A source of full-color frames.
pub trait CaptureDevice: Send {
    /// Block until the next frame is available.
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Release the underlying device. Further reads fail with
    /// [`CaptureError::NotOpened`].
    fn release(&mut self);

    fn description(&self) -> String;
}
