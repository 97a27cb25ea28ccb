//! Camera-guided pick-and-place sorting arm.
//!
//! A [`Session`] owns the camera and actuator link for one run. The
//! [`Orchestrator`] drives pick cycles over it: rectify and scan the tray,
//! turn the object's centroid into per-axis travel times with the
//! [`CalibrationModel`], and send the actuation sequence to the motor
//! controller.
//!
//! ```no_run
//! use hardware::{RecordingConnector, ScriptedCamera};
//! use sorter::{Orchestrator, Session, SorterConfig};
//!
//! let session = Session::start(
//!     SorterConfig::default(),
//!     Box::new(ScriptedCamera::new()),
//!     Box::new(RecordingConnector::new()),
//!     || true,
//! )?;
//! let mut orchestrator = Orchestrator::new(session);
//! let outcome = orchestrator.run_one_shot();
//! println!("{outcome:?}");
//! # Ok::<(), sorter::SorterError>(())
//! ```

pub mod calibration;
pub mod cancel;
pub mod config;
pub mod console;
pub mod debug_image;
pub mod error;
pub mod orchestrator;
pub mod session;

pub use calibration::{fit_line, CalibrationError, CalibrationModel, LinearFit, MotionPlan};
pub use cancel::{AfterPolls, CancelFlag, CancelSignal};
pub use config::{
    CalibrationConfig, CalibrationPoint, CameraConfig, ConfigStorage, CycleConfig, LinkConfig,
    SorterConfig, TrayConfig,
};
pub use error::{Result, SorterError};
pub use orchestrator::{actuation_sequence, ActuateStep, CycleOutcome, CycleState, Orchestrator, RunSummary};
pub use session::{Scan, Session};
