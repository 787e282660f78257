//! Expression bridge from a face landmark detector to iFacialMocap receivers.
//!
//! Per-frame detector output (a 4x4 facial transformation matrix and a list
//! of ARKit-style blendshape scores) is converted into canonical
//! [`TrackingData`](tracking_data::TrackingData): six head values and
//! blendshape scores in `[0, 100]` with left and right mirrored. The result
//! passes through a calibration sink and is sent over UDP.
//!
//! The pipeline consists of:
//! 1. A [`CameraSource`](camera::CameraSource) producing RGB frames
//! 2. An [`AsyncDetector`](detector::AsyncDetector) running a landmark model on a worker thread
//! 3. [`FrameTransform`](frame_transform::FrameTransform) mapping one result into tracking data
//! 4. A [`Dispatcher`](detection_loop::Dispatcher) feeding calibration and transport
//!
//! # Examples
//!
//! ## Transforming one result
//!
//! ```
//! use expression_bridge::{
//!     detector::DetectionResult, frame_transform::FrameTransform, tracking_data::TrackingData,
//! };
//!
//! # fn main() -> expression_bridge::Result<()> {
//! let identity = [
//!     [1.0, 0.0, 0.0, 0.0],
//!     [0.0, 1.0, 0.0, 0.0],
//!     [0.0, 0.0, 1.0, 0.0],
//!     [0.0, 0.0, 0.0, 1.0],
//! ];
//! let result = DetectionResult::single_face(
//!     identity,
//!     &[("jawOpen", 0.5), ("eyeBlinkLeft", 0.2), ("eyeBlinkRight", 0.4)],
//! );
//!
//! let mut data = TrackingData::new();
//! FrameTransform::default().apply(&result, &mut data)?;
//!
//! assert_eq!(data.blendshape("jawOpen"), Some(50.0));
//! assert!((data.blendshape("eyeBlink_L").unwrap() - 30.0).abs() < 1e-9);
//! # Ok(())
//! # }
//! ```
//!
//! ## Running the loop on recorded input
//!
//! ```no_run
//! use expression_bridge::{
//!     calibration::Calibrator,
//!     camera::image_sequence::ImageSequenceCamera,
//!     detection_loop::{DetectionLoop, Dispatcher, ShutdownSignal},
//!     detector::ReplayModel,
//!     frame_transform::FrameTransform,
//!     transport::UdpTransport,
//! };
//!
//! # fn main() -> expression_bridge::Result<()> {
//! let camera = ImageSequenceCamera::open("frames/", Some(30))?;
//! let model = ReplayModel::from_file("detections.jsonl", false)?;
//! let transport = UdpTransport::with_target("127.0.0.1:49983".parse().unwrap())?;
//!
//! let dispatcher = Dispatcher::new(FrameTransform::default(), Box::new(Calibrator::new()), Box::new(transport));
//! let summary = DetectionLoop::new(Box::new(camera), Box::new(model), dispatcher, ShutdownSignal::new())?
//!     .wait_for_detector(true)
//!     .run();
//! println!("{} frames dispatched", summary.dispatch.dispatched);
//! # Ok(())
//! # }
//! ```

/// Error types and result handling
pub mod error;

/// Constants used throughout the bridge
pub mod constants;

/// Configuration management
pub mod config;

/// Canonical tracking data model
pub mod tracking_data;

/// Detector to canonical blendshape names
pub mod name_mapper;

/// Affine decomposition and Euler angles
pub mod pose;

/// Detection result to tracking data
pub mod frame_transform;

/// Landmark detector integration
pub mod detector;

/// Camera backends
pub mod camera;

/// Neutral-pose calibration
pub mod calibration;

/// iFacialMocap UDP transport
pub mod transport;

/// Capture, detection and dispatch loop
pub mod detection_loop;

/// Numeric conversion helpers
pub mod utils;

pub use error::{Error, Result};
