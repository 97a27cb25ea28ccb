use std::io::Write;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::command::Command;
use super::link::{ActuatorLink, LinkConnector, LinkError, LinkResult};

/// Fixed delays around controller I/O.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkTiming {
    /// Wait after opening the port while the controller resets
    pub reset_delay: Duration,
    /// Wait after each command for the controller to start executing it
    pub settle: Duration,
    /// Wait between closing a failed link and reopening it
    pub reconnect_backoff: Duration,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            reset_delay: Duration::from_secs(2),
            settle: Duration::from_millis(500),
            reconnect_backoff: Duration::from_secs(2),
        }
    }
}

/// Sends commands to the actuator controller over one owned connection.
///
/// Writes never retry. A failed [`send`](Self::send) is reported to the
/// caller, which decides whether to [`reconnect`](Self::reconnect). The
/// connection is closed when the dispatcher is dropped.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use hardware::actuator::{Command, CommandDispatcher, Grip, LinkTiming, SerialConnector};
///
/// let connector = SerialConnector::new("/dev/ttyACM0", 9600, Duration::from_secs(1));
/// let mut dispatcher = CommandDispatcher::new(Box::new(connector), LinkTiming::default());
/// dispatcher.open()?;
/// dispatcher.send(&Command::Gripper(Grip::Open))?;
/// # Ok::<(), hardware::LinkError>(())
/// ```
pub struct CommandDispatcher {
    connector: Box<dyn LinkConnector>,
    link: Option<Box<dyn ActuatorLink>>,
    timing: LinkTiming,
}

impl CommandDispatcher {
    /// Create a dispatcher. No connection is made until [`open`](Self::open).
    pub fn new(connector: Box<dyn LinkConnector>, timing: LinkTiming) -> Self {
        Self {
            connector,
            link: None,
            timing,
        }
    }

    /// Open the connection and wait out the controller reset.
    ///
    /// Does nothing if already connected.
    pub fn open(&mut self) -> LinkResult<()> {
        if self.link.is_some() {
            return Ok(());
        }
        let link = self.connector.open()?;
        self.link = Some(link);
        info!(
            "Actuator link {} open, waiting {:?} for controller reset",
            self.connector.describe(),
            self.timing.reset_delay
        );
        thread::sleep(self.timing.reset_delay);
        Ok(())
    }

    /// Write one command and wait the settle interval.
    pub fn send(&mut self, command: &Command) -> LinkResult<()> {
        self.send_line(&command.to_string())
    }

    /// Write a raw line (without terminator) and wait the settle interval.
    ///
    /// On error the stale link is kept until [`reconnect`](Self::reconnect)
    /// or [`close`](Self::close) replaces it.
    pub fn send_line(&mut self, line: &str) -> LinkResult<()> {
        let link = self.link.as_mut().ok_or(LinkError::NotConnected)?;

        debug!("Sending command: {line}");
        let mut framed = Vec::with_capacity(line.len() + 1);
        framed.extend_from_slice(line.as_bytes());
        framed.push(b'\n');

        link.write_all(&framed)?;
        link.flush()?;

        thread::sleep(self.timing.settle);
        Ok(())
    }

    /// Drop the current link, back off, and open the same endpoint again.
    pub fn reconnect(&mut self) -> LinkResult<()> {
        warn!(
            "Reconnecting actuator link {} after {:?}",
            self.connector.describe(),
            self.timing.reconnect_backoff
        );
        self.close();
        thread::sleep(self.timing.reconnect_backoff);
        self.open()
    }

    pub fn close(&mut self) {
        if let Some(mut link) = self.link.take() {
            let _ = link.flush();
            drop(link);
            info!("Actuator link {} closed", self.connector.describe());
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn describe(&self) -> String {
        self.connector.describe()
    }

    pub fn timing(&self) -> &LinkTiming {
        &self.timing
    }
}

impl Drop for CommandDispatcher {
    fn drop(&mut self) {
        self.close();
    }
}
