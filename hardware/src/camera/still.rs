use std::path::PathBuf;

use tracing::{debug, info};
use vision::Frame;

use super::{CaptureDevice, CaptureError};

/// Replays still image files as camera frames, cycling through them in order.
///
/// Useful for bench runs: capture an empty tray and a few loaded trays once,
/// then drive the control loop from the files.
#[derive(Debug)]
pub struct ImageFileCamera {
    paths: Vec<PathBuf>,
    next: usize,
    released: bool,
}

impl ImageFileCamera {
    /// Fails with [`CaptureError::NotOpened`] if the list is empty or a file
    /// is missing.
    pub fn open(paths: Vec<PathBuf>) -> Result<Self, CaptureError> {
        if paths.is_empty() {
            return Err(CaptureError::NotOpened {
                device: "image files".to_string(),
                reason: "no image paths given".to_string(),
            });
        }
        if let Some(missing) = paths.iter().find(|p| !p.is_file()) {
            return Err(CaptureError::NotOpened {
                device: missing.display().to_string(),
                reason: "file not found".to_string(),
            });
        }
        info!("Replaying {} image file(s) as camera frames", paths.len());
        Ok(Self {
            paths,
            next: 0,
            released: false,
        })
    }
}

impl CaptureDevice for ImageFileCamera {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        if self.released {
            return Err(CaptureError::NotOpened {
                device: self.description(),
                reason: "released".to_string(),
            });
        }
        let path = &self.paths[self.next];
        self.next = (self.next + 1) % self.paths.len();

        debug!("Reading frame from {}", path.display());
        let image = image::open(path).map_err(|e| CaptureError::FrameNotRead {
            device: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Frame::from_rgb_image(&image.to_rgb8()))
    }

    fn release(&mut self) {
        self.released = true;
    }

    fn description(&self) -> String {
        format!("{} image file(s)", self.paths.len())
    }
}
