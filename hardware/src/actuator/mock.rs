//! In-memory actuator link for dry runs and tests.

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use super::link::{ActuatorLink, LinkConnector, LinkError, LinkResult};

#[derive(Debug, Default)]
struct Record {
    bytes: Vec<u8>,
    lines: Vec<String>,
    opens: usize,
    closes: usize,
    write_attempts: usize,
    failing_writes: BTreeSet<usize>,
    failing_opens: usize,
}

/// Connector whose links record every line instead of touching hardware.
///
/// Clones share one record, so a test can keep a clone while the dispatcher
/// owns the other. Failures are injected by write-attempt index (counted
/// across reconnects, starting at 0) or as a number of upcoming failed opens.
#[derive(Debug, Clone, Default)]
pub struct RecordingConnector {
    record: Arc<Mutex<Record>>,
    echo: bool,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log each accepted line at info level, for `--dry-run`.
    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Fail the `attempt`-th line written through any link from this connector.
    pub fn fail_write(self, attempt: usize) -> Self {
        self.lock().failing_writes.insert(attempt);
        self
    }

    /// Make the next `count` calls to `open` fail.
    pub fn fail_next_opens(&self, count: usize) {
        self.lock().failing_opens = count;
    }

    /// Lines written successfully, without terminators.
    pub fn lines(&self) -> Vec<String> {
        self.lock().lines.clone()
    }

    /// Raw bytes written successfully.
    pub fn bytes(&self) -> Vec<u8> {
        self.lock().bytes.clone()
    }

    pub fn write_attempts(&self) -> usize {
        self.lock().write_attempts
    }

    pub fn open_count(&self) -> usize {
        self.lock().opens
    }

    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    pub fn is_open(&self) -> bool {
        let record = self.lock();
        record.opens > record.closes
    }

    fn lock(&self) -> MutexGuard<'_, Record> {
        self.record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LinkConnector for RecordingConnector {
    fn open(&mut self) -> LinkResult<Box<dyn ActuatorLink>> {
        let mut record = self.lock();
        if record.failing_opens > 0 {
            record.failing_opens -= 1;
            return Err(LinkError::OpenFailed {
                port: "recording".to_string(),
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "injected open failure"),
            });
        }
        record.opens += 1;
        drop(record);

        Ok(Box::new(RecordingLink {
            record: Arc::clone(&self.record),
            pending: Vec::new(),
            echo: self.echo,
        }))
    }

    fn describe(&self) -> String {
        "recording link".to_string()
    }
}

struct RecordingLink {
    record: Arc<Mutex<Record>>,
    pending: Vec<u8>,
    echo: bool,
}

impl Write for RecordingLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        let mut record = self.record.lock().unwrap_or_else(|p| p.into_inner());

        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            let attempt = record.write_attempts;
            record.write_attempts += 1;

            if record.failing_writes.contains(&attempt) {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    format!("injected failure on write {attempt}"),
                ));
            }

            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]).into_owned();
            if self.echo {
                info!("[dry-run] {line}");
            }
            record.bytes.extend_from_slice(&raw);
            record.lines.push(line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for RecordingLink {
    fn drop(&mut self) {
        let mut record = self.record.lock().unwrap_or_else(|p| p.into_inner());
        record.closes += 1;
    }
}
