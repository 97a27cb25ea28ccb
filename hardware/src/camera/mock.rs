use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use vision::Frame;

use super::{CaptureDevice, CaptureError};

/// Observes a [`ScriptedCamera`] after it has been handed off.
#[derive(Debug, Clone, Default)]
pub struct CameraProbe {
    released: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
}

impl CameraProbe {
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

/// Camera that returns a scripted sequence of frames and failures.
///
/// Once the script runs out the last frame is repeated; an empty script
/// fails every read. Dropping the camera counts as a release.
#[derive(Debug, Default)]
pub struct ScriptedCamera {
    script: VecDeque<Option<Frame>>,
    last: Option<Frame>,
    probe: CameraProbe,
}

impl ScriptedCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_frame(mut self, frame: Frame) -> Self {
        self.script.push_back(Some(frame));
        self
    }

    /// Queue one [`CaptureError::FrameNotRead`].
    pub fn then_failure(mut self) -> Self {
        self.script.push_back(None);
        self
    }

    pub fn probe(&self) -> CameraProbe {
        self.probe.clone()
    }
}

impl CaptureDevice for ScriptedCamera {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        if self.probe.is_released() {
            return Err(CaptureError::NotOpened {
                device: self.description(),
                reason: "released".to_string(),
            });
        }
        self.probe.reads.fetch_add(1, Ordering::SeqCst);

        let not_read = |reason: &str| CaptureError::FrameNotRead {
            device: "scripted camera".to_string(),
            reason: reason.to_string(),
        };
        match self.script.pop_front() {
            Some(Some(frame)) => {
                self.last = Some(frame.clone());
                Ok(frame)
            }
            Some(None) => Err(not_read("scripted failure")),
            None => self.last.clone().ok_or_else(|| not_read("script is empty")),
        }
    }

    fn release(&mut self) {
        self.probe.released.store(true, Ordering::SeqCst);
    }

    fn description(&self) -> String {
        "scripted camera".to_string()
    }
}

impl Drop for ScriptedCamera {
    fn drop(&mut self) {
        self.release();
    }
}
