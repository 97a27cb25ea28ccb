//! V4L2 webcam capture.
//!
//! The device stays open for the session. Each read starts a short MMAP
//! stream, discards `warmup_frames` so auto-exposure settles, and decodes
//! the next buffer. MJPG and YUYV pixel formats are supported.

use image::{ImageFormat, Rgb, RgbImage};
use tracing::{debug, info};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;
use vision::Frame;

use super::{CaptureDevice, CaptureError};

#[derive(Debug, Clone)]
pub struct V4l2Config {
    pub device_path: String,
    pub width: u32,
    pub height: u32,
    /// Requested pixel format, "MJPG" or "YUYV"
    pub fourcc: String,
    pub warmup_frames: usize,
}

impl Default for V4l2Config {
    fn default() -> Self {
        Self {
            device_path: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            fourcc: "MJPG".to_string(),
            warmup_frames: 5,
        }
    }
}

pub struct V4l2Camera {
    config: V4l2Config,
    device: Option<Device>,
    fourcc: FourCC,
    width: u32,
    height: u32,
}

impl V4l2Camera {
    pub fn open(config: V4l2Config) -> Result<Self, CaptureError> {
        let not_opened = |reason: String| CaptureError::NotOpened {
            device: config.device_path.clone(),
            reason,
        };

        let device = Device::with_path(&config.device_path).map_err(|e| not_opened(e.to_string()))?;

        let b = config.fourcc.as_bytes();
        if b.len() != 4 {
            return Err(not_opened(format!("FourCC {:?} must be 4 characters", config.fourcc)));
        }
        let mut format = device.format().map_err(|e| not_opened(e.to_string()))?;
        format.fourcc = FourCC::new(&[b[0], b[1], b[2], b[3]]);
        format.width = config.width;
        format.height = config.height;
        // The driver may substitute the nearest supported mode
        let actual = device
            .set_format(&format)
            .map_err(|e| not_opened(e.to_string()))?;

        info!(
            "Camera {} open: {}x{} [{}]",
            config.device_path, actual.width, actual.height, actual.fourcc
        );

        Ok(Self {
            config,
            device: Some(device),
            fourcc: actual.fourcc,
            width: actual.width,
            height: actual.height,
        })
    }

    fn decode(&self, data: &[u8]) -> Result<RgbImage, String> {
        match self.fourcc.str().map_err(|e| e.to_string())? {
            "MJPG" => image::load_from_memory_with_format(data, ImageFormat::Jpeg)
                .map(|img| img.to_rgb8())
                .map_err(|e| e.to_string()),
            "YUYV" => Ok(yuyv_to_rgb(data, self.width, self.height)),
            other => Err(format!("unsupported pixel format {other}")),
        }
    }
}

impl CaptureDevice for V4l2Camera {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let not_read = |reason: String| CaptureError::FrameNotRead {
            device: self.config.device_path.clone(),
            reason,
        };
        let device = self.device.as_ref().ok_or_else(|| CaptureError::NotOpened {
            device: self.config.device_path.clone(),
            reason: "released".to_string(),
        })?;

        let mut stream = MmapStream::with_buffers(device, Type::VideoCapture, 4)
            .map_err(|e| not_read(e.to_string()))?;
        for _ in 0..self.config.warmup_frames {
            stream.next().map_err(|e| not_read(e.to_string()))?;
        }
        let (data, meta) = stream.next().map_err(|e| not_read(e.to_string()))?;
        debug!("Captured frame seq {} ({} bytes)", meta.sequence, data.len());

        let rgb = self.decode(data).map_err(not_read)?;
        Ok(Frame::from_rgb_image(&rgb))
    }

    fn release(&mut self) {
        if self.device.take().is_some() {
            info!("Camera {} released", self.config.device_path);
        }
    }

    fn description(&self) -> String {
        format!("V4L2 {}", self.config.device_path)
    }
}

/// Convert packed YUYV 4:2:2 to RGB using BT.601 coefficients.
fn yuyv_to_rgb(yuyv: &[u8], w: u32, h: u32) -> RgbImage {
    let mut out = RgbImage::new(w, h);
    let convert = |y: f32, u: f32, v: f32| {
        Rgb([
            (y + 1.402 * v).clamp(0.0, 255.0) as u8,
            (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8,
            (y + 1.772 * u).clamp(0.0, 255.0) as u8,
        ])
    };

    // Each 4-byte group [Y0 U Y1 V] covers two pixels
    for (i, chunk) in yuyv.chunks_exact(4).enumerate() {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        let idx = i as u32 * 2;
        let (x, y) = (idx % w, idx / w);
        if y >= h {
            break;
        }
        out.put_pixel(x, y, convert(chunk[0] as f32, u, v));
        if x + 1 < w {
            out.put_pixel(x + 1, y, convert(chunk[2] as f32, u, v));
        }
    }
    out
}
