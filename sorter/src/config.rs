//! Rig configuration.
//!
//! Every physical constant of the rig lives here: tray corners, calibration
//! observations, detector tunables, serial and camera settings, and cycle
//! timing. Defaults reproduce the commissioned rig. The file is JSON and
//! every section may be omitted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use hardware::LinkTiming;
use serde::{Deserialize, Serialize};
use tracing::info;
use vision::{DetectorConfig, Point2D};

/// Tray boundary as clicked on a setup photograph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrayConfig {
    /// Exactly four full-frame corners, any order
    pub corners: Vec<Point2D>,
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            corners: vec![
                Point2D::new(374.0, 122.0),
                Point2D::new(238.0, 133.0),
                Point2D::new(267.0, 428.0),
                Point2D::new(426.0, 394.0),
            ],
        }
    }
}

/// One observation: the object at `pixel` needed `seconds` of travel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub pixel: f64,
    pub seconds: f64,
}

impl CalibrationPoint {
    pub const fn new(pixel: f64, seconds: f64) -> Self {
        Self { pixel, seconds }
    }
}

/// Per-axis calibration observations in full-frame pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub x: Vec<CalibrationPoint>,
    pub y: Vec<CalibrationPoint>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            x: vec![
                CalibrationPoint::new(367.0, 0.0),
                CalibrationPoint::new(230.0, 1.2),
                CalibrationPoint::new(260.0, 1.2),
                CalibrationPoint::new(415.0, 0.0),
            ],
            y: vec![
                CalibrationPoint::new(106.0, 0.4),
                CalibrationPoint::new(121.0, 0.4),
                CalibrationPoint::new(416.0, 4.2),
                CalibrationPoint::new(377.0, 4.2),
            ],
        }
    }
}

/// Serial link to the motor controller. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub port: String,
    pub baud_rate: u32,
    pub timeout_s: f64,
    /// Controller resets when the port opens
    pub reset_delay_s: f64,
    pub settle_s: f64,
    pub reconnect_backoff_s: f64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        let port = if cfg!(windows) { "COM7" } else { "/dev/ttyACM0" };
        Self {
            port: port.to_string(),
            baud_rate: 9600,
            timeout_s: 1.0,
            reset_delay_s: 2.0,
            settle_s: 0.5,
            reconnect_backoff_s: 2.0,
        }
    }
}

impl LinkConfig {
    pub fn timeout(&self) -> Duration {
        seconds(self.timeout_s)
    }

    pub fn timing(&self) -> LinkTiming {
        LinkTiming {
            reset_delay: seconds(self.reset_delay_s),
            settle: seconds(self.settle_s),
            reconnect_backoff: seconds(self.reconnect_backoff_s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub device_path: String,
    pub width: u32,
    pub height: u32,
    pub fourcc: String,
    /// Frames discarded before each capture while exposure settles
    pub warmup_frames: usize,
}

impl Default for CameraConfig {
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

/// Pick cycle timing. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Pause after every cycle, successful or not
    pub cooldown_s: f64,
    /// Pause before retrying after the camera fails in continuous mode
    pub device_retry_s: f64,
    pub descend_s: f64,
    pub ascend_s: f64,
    /// Send one `XY` move instead of separate `X` and `Y` moves
    pub combined_xy: bool,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cooldown_s: 10.0,
            device_retry_s: 2.0,
            descend_s: 2.3,
            ascend_s: 3.1,
            combined_xy: true,
        }
    }
}

impl CycleConfig {
    pub fn cooldown(&self) -> Duration {
        seconds(self.cooldown_s)
    }

    pub fn device_retry(&self) -> Duration {
        seconds(self.device_retry_s)
    }
}

/// Complete rig configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SorterConfig {
    pub tray: TrayConfig,
    pub calibration: CalibrationConfig,
    pub detector: DetectorConfig,
    pub link: LinkConfig,
    pub camera: CameraConfig,
    pub cycle: CycleConfig,
}

impl SorterConfig {
    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Negative, NaN and overflowing values become zero.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// Locates the rig configuration on disk (defaults to `~/.sorter/config.json`).
#[derive(Debug, Clone)]
pub struct ConfigStorage {
    root_path: PathBuf,
}

impl ConfigStorage {
    /// Create a new config storage with default path (~/.sorter)
    pub fn new() -> std::io::Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::NotFound, "HOME not set"))?;
        Ok(Self {
            root_path: PathBuf::from(home).join(".sorter"),
        })
    }

    /// Create a new config storage with custom root path
    pub fn with_path(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn config_path(&self) -> PathBuf {
        self.root_path.join("config.json")
    }

    /// Load the stored configuration, falling back to defaults if none exists.
    pub fn load(&self) -> std::io::Result<SorterConfig> {
        let path = self.config_path();
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(SorterConfig::default());
        }
        info!("Loading config from {}", path.display());
        SorterConfig::load_from_file(&path)
    }

    /// Save the configuration, creating the directory if needed.
    /// Returns the path written.
    pub fn save(&self, config: &SorterConfig) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.root_path)?;
        let path = self.config_path();
        config.save_to_file(&path)?;
        Ok(path)
    }
}
