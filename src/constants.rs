//! Constants used throughout the bridge

/// Rotation scale factor for the x axis (pitch)
pub const ROT_X_FACTOR: f64 = 80.0;

/// Rotation scale factor for the y axis (yaw)
pub const ROT_Y_FACTOR: f64 = -100.0;

/// Rotation scale factor for the z axis (roll)
pub const ROT_Z_FACTOR: f64 = -60.0;

/// Translation scale factor for the x axis
pub const POS_X_FACTOR: f64 = -0.01;

/// Translation scale factor for the y axis
pub const POS_Y_FACTOR: f64 = 0.01;

/// Translation scale factor for the z axis
pub const POS_Z_FACTOR: f64 = 0.01;

/// Average both eyes' blink scores by default
pub const DEFAULT_SYNC_EYE_BLINK: bool = true;

/// Detector scores arrive in [0, 1]; canonical scores live in [0, 100]
pub const BLENDSHAPE_SCALE: f64 = 100.0;

/// Upper bound of canonical scores and confidence
pub const MAX_SCORE: f64 = 100.0;

/// Number of values in the canonical head pose
pub const HEAD_VALUES: usize = 6;

/// Default iFacialMocap UDP port
pub const IFACIALMOCAP_PORT: u16 = 49983;

/// Handshake a receiver sends to start an iFacialMocap stream
pub const IFACIALMOCAP_HANDSHAKE: &str = "iFacialMocap_sahuasouryya9218sauhuiayeta91555dy3719";

/// Detection results that may wait for the dispatcher before the worker blocks
pub const DISPATCH_QUEUE_CAPACITY: usize = 4;

/// Frames that may wait for the detector while another is being processed
pub const DETECTOR_QUEUE_CAPACITY: usize = 1;

/// Default number of frames sampled for neutral-pose calibration
pub const DEFAULT_CALIBRATION_FRAMES: usize = 60;

/// Numeric precision epsilon for matrix decomposition
pub const EPSILON: f64 = 1e-10;
