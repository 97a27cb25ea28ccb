//! Actuator controller link.
//!
//! The controller accepts one whitespace-separated command per line. The
//! [`CommandDispatcher`] owns the connection, frames each [`Command`] with a
//! trailing newline, and waits out the controller's settle interval after
//! every write.

mod command;
mod dispatcher;
mod link;
mod mock;

pub use command::{Axis, Command, CommandParseError, Direction, Grip, Lift};
pub use dispatcher::{CommandDispatcher, LinkTiming};
pub use link::{list_ports, ActuatorLink, LinkConnector, LinkError, LinkResult, SerialConnector};
pub use mock::RecordingConnector;
