//! Hardware drivers for the sorting arm.
//!
//! - [`actuator`]: text command protocol and the serial link to the motor
//!   controller, wrapped by [`CommandDispatcher`]
//! - [`camera`]: frame capture devices behind the [`CaptureDevice`] trait
//!
//! Both sides ship recording/scripted doubles so the control loop can run
//! without a rig attached.
//!
//! # Features
//!
//! - `v4l2` - V4L2 camera driver (Linux only)

pub mod actuator;
pub mod camera;

pub use actuator::{
    ActuatorLink, Command, CommandDispatcher, LinkConnector, LinkError, LinkResult, LinkTiming,
    RecordingConnector, SerialConnector,
};
pub use camera::{CaptureDevice, CaptureError, ImageFileCamera, ScriptedCamera};
