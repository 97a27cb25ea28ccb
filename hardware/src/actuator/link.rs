//! Byte-stream transport to the actuator controller.

use std::io::Write;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, StopBits};
use thiserror::Error;
use tracing::info;

/// Errors on the actuator link.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The port could not be opened.
    #[error("failed to open {port}: {source}")]
    OpenFailed {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Write or flush failed on an open connection.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("actuator link is not connected")]
    NotConnected,
}

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// An open, writable connection to the controller.
pub trait ActuatorLink: Write + Send {}

impl<T: Write + Send> ActuatorLink for T {}

/// Opens connections to one configured endpoint.
///
/// The dispatcher holds a connector rather than a connection so that it can
/// drop a stale link and reopen the same port after a failure.
pub trait LinkConnector: Send {
    fn open(&mut self) -> LinkResult<Box<dyn ActuatorLink>>;

    /// Human-readable endpoint, e.g. `/dev/ttyUSB0 @ 9600`.
    fn describe(&self) -> String;
}

/// Serial port endpoint, 8N1 without flow control.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    path: String,
    baud_rate: u32,
    timeout: Duration,
}

impl SerialConnector {
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyACM0" or "COM7")
    /// * `baud_rate` - Baud rate (the controller firmware uses 9600)
    /// * `timeout` - Read/write timeout for the port
    pub fn new(path: impl Into<String>, baud_rate: u32, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            timeout,
        }
    }
}

impl LinkConnector for SerialConnector {
    fn open(&mut self) -> LinkResult<Box<dyn ActuatorLink>> {
        let port = serialport::new(&self.path, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.timeout)
            .open()
            .map_err(|source| LinkError::OpenFailed {
                port: self.path.clone(),
                source,
            })?;

        info!("Opened serial port: {} at {} baud", self.path, self.baud_rate);
        Ok(Box::new(port))
    }

    fn describe(&self) -> String {
        format!("{} @ {}", self.path, self.baud_rate)
    }
}

/// Names of the serial ports present on this machine.
pub fn list_ports() -> LinkResult<Vec<String>> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}
