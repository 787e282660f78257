//! Configuration management for the expression bridge

use crate::{
    constants::{
        DEFAULT_CALIBRATION_FRAMES, DEFAULT_SYNC_EYE_BLINK, IFACIALMOCAP_PORT, POS_X_FACTOR, POS_Y_FACTOR,
        POS_Z_FACTOR, ROT_X_FACTOR, ROT_Y_FACTOR, ROT_Z_FACTOR,
    },
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Head pose scale factors
    pub pose: PoseScale,

    /// Blendshape merge policy
    pub blendshapes: BlendshapeConfig,

    /// Camera configuration
    pub camera: CameraConfig,

    /// Detector configuration
    pub detector: DetectorConfig,

    /// Transport configuration
    pub transport: TransportConfig,

    /// Calibration configuration
    pub calibration: CalibrationConfig,
}

/// Per-axis multipliers from detector units to receiver units.
///
/// The sign of each factor encodes an axis flip between the two frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseScale {
    /// Rotation about x (radians to receiver units)
    pub rot_x: f64,
    /// Rotation about y
    pub rot_y: f64,
    /// Rotation about z
    pub rot_z: f64,
    /// Translation along x (detector units to receiver units)
    pub pos_x: f64,
    /// Translation along y
    pub pos_y: f64,
    /// Translation along z
    pub pos_z: f64,
}

/// Blendshape merge policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendshapeConfig {
    /// Write the average of both eyes into both blink channels
    pub sync_eye_blink: bool,
}

/// Camera backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraBackend {
    /// `OpenCV` `VideoCapture`
    Opencv,
    /// nokhwa native capture
    Nokhwa,
    /// Directory of still images
    ImageSequence,
}

impl CameraBackend {
    /// Backend used when the configuration does not name one
    #[must_use]
    pub fn platform_default() -> Self {
        if cfg!(target_os = "linux") {
            Self::Opencv
        } else {
            Self::Nokhwa
        }
    }
}

impl std::str::FromStr for CameraBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "opencv" => Ok(Self::Opencv),
            "nokhwa" => Ok(Self::Nokhwa),
            "image_sequence" | "images" => Ok(Self::ImageSequence),
            _ => Err(Error::ConfigError(format!("Unknown camera backend: {s}"))),
        }
    }
}

/// Requested capture format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frames per second
    pub fps: u32,
}

/// Camera configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Backend; platform default when absent
    pub backend: Option<CameraBackend>,

    /// Device index for live backends
    pub device: u32,

    /// Requested format; backend default when absent
    pub capability: Option<Capability>,

    /// Image directory for the image-sequence backend
    pub path: Option<PathBuf>,
}

/// Detector configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// JSON-lines file of recorded detection results
    pub replay_file: Option<PathBuf>,

    /// Restart the recording when it runs out
    pub replay_loop: bool,
}

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Receiver address (`host:port`); when absent, wait for a handshake
    pub target: Option<String>,

    /// Local address to bind
    pub listen_address: String,

    /// Local port to bind (receives the handshake)
    pub port: u16,
}

/// Calibration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Frames averaged for the neutral pose
    pub frames: usize,

    /// Calibration profile to load at startup and save after calibrating
    pub profile: Option<PathBuf>,

    /// Calibrate as soon as tracking starts
    pub on_start: bool,
}

impl Default for PoseScale {
    fn default() -> Self {
        Self {
            rot_x: ROT_X_FACTOR,
            rot_y: ROT_Y_FACTOR,
            rot_z: ROT_Z_FACTOR,
            pos_x: POS_X_FACTOR,
            pos_y: POS_Y_FACTOR,
            pos_z: POS_Z_FACTOR,
        }
    }
}

impl Default for BlendshapeConfig {
    fn default() -> Self {
        Self {
            sync_eye_blink: DEFAULT_SYNC_EYE_BLINK,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            target: None,
            listen_address: "0.0.0.0".to_string(),
            port: IFACIALMOCAP_PORT,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            frames: DEFAULT_CALIBRATION_FRAMES,
            profile: None,
            on_start: false,
        }
    }
}

impl PoseScale {
    /// Factors as `[rot_x, rot_y, rot_z, pos_x, pos_y, pos_z]`
    #[must_use]
    pub fn as_array(&self) -> [f64; 6] {
        [self.rot_x, self.rot_y, self.rot_z, self.pos_x, self.pos_y, self.pos_z]
    }
}

impl CameraConfig {
    /// Backend to open, falling back to the platform default
    #[must_use]
    pub fn resolved_backend(&self) -> CameraBackend {
        self.backend.unwrap_or_else(CameraBackend::platform_default)
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns a [`Error::ConfigError`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.pose.as_array().iter().any(|factor| !factor.is_finite()) {
            return Err(Error::ConfigError("Pose scale factors must be finite".to_string()));
        }

        if let Some(capability) = &self.camera.capability {
            if capability.width == 0 || capability.height == 0 {
                return Err(Error::ConfigError(
                    "Camera width and height must be greater than 0".to_string(),
                ));
            }
            if capability.fps == 0 {
                return Err(Error::ConfigError("Camera FPS must be greater than 0".to_string()));
            }
        }

        if self.camera.resolved_backend() == CameraBackend::ImageSequence {
            match &self.camera.path {
                None => {
                    return Err(Error::ConfigError(
                        "Image sequence backend requires camera.path".to_string(),
                    ))
                }
                Some(path) if !path.is_dir() => {
                    return Err(Error::ConfigError(format!(
                        "Image directory not found: {}",
                        path.display()
                    )))
                }
                Some(_) => {}
            }
        }

        if let Some(replay) = &self.detector.replay_file {
            if !replay.exists() {
                return Err(Error::ConfigError(format!(
                    "Replay file not found: {}",
                    replay.display()
                )));
            }
        }

        if self.transport.port == 0 {
            return Err(Error::ConfigError("Transport port must be greater than 0".to_string()));
        }

        if self.calibration.frames == 0 {
            return Err(Error::ConfigError(
                "Calibration frame count must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Expression Bridge Configuration

# Head pose scale factors (sign flips an axis)
pose:
  rot_x: 80.0
  rot_y: -100.0
  rot_z: -60.0
  pos_x: -0.01
  pos_y: 0.01
  pos_z: 0.01

# Blendshape merge policy
blendshapes:
  sync_eye_blink: true

# Camera (backend: opencv, nokhwa, image_sequence)
camera:
  backend: opencv
  device: 0
  capability:
    width: 640
    height: 480
    fps: 30

# Recorded detections to replay
detector:
  replay_loop: false

# iFacialMocap receiver; omit target to wait for a handshake
transport:
  listen_address: "0.0.0.0"
  port: 49983

# Neutral pose calibration
calibration:
  frames: 60
  on_start: false
"#;
