//! Error types for the expression bridge library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` camera operation failed
    #[cfg(feature = "opencv")]
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// YAML (de)serialization failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Camera could not be opened or read
    #[error("Camera error: {0}")]
    Camera(String),

    /// Detector rejected a submission or failed to run
    #[error("Detector error: {0}")]
    Detector(String),

    /// Timestamp did not increase past the previous submission
    #[error("Non-monotonic timestamp: {current} ms after {previous} ms")]
    NonMonotonicTimestamp {
        /// Last accepted timestamp
        previous: u64,
        /// Rejected timestamp
        current: u64,
    },

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transport send failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Calibration profile error
    #[error("Calibration error: {0}")]
    Calibration(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Worker thread terminated unexpectedly
    #[error("Thread error: {0}")]
    Thread(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
