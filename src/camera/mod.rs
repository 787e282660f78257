//! Camera sources.
//!
//! Every backend exposes the same [`CameraSource`] interface; which one is
//! opened is decided once at startup by [`open_camera`].

/// Directory-of-images camera
pub mod image_sequence;

/// `OpenCV` `VideoCapture` camera
#[cfg(feature = "opencv")]
pub mod opencv_backend;

/// nokhwa native camera
#[cfg(feature = "nokhwa")]
pub mod nokhwa_backend;

use crate::{
    config::{CameraBackend, CameraConfig},
    Error, Result,
};
use log::info;

/// One RGB frame
pub type Frame = image::RgbImage;

/// Source of frames for the detection loop.
///
/// Sources stay on the capture thread, so implementations need not be `Send`.
pub trait CameraSource {
    /// Read the next frame; `Ok(None)` signals end of stream
    ///
    /// # Errors
    ///
    /// Returns an error if the device fails while reading.
    fn read_frame(&mut self) -> Result<Option<Frame>>;

    /// Human readable device name
    fn name(&self) -> String;

    /// Release the device; reading afterwards yields end of stream
    fn release(&mut self);
}

/// Open the configured camera backend
///
/// # Errors
///
/// Returns an error if the backend cannot open the device, or if the backend
/// was not compiled into this build.
pub fn open_camera(config: &CameraConfig) -> Result<Box<dyn CameraSource>> {
    let backend = config.resolved_backend();
    info!("Opening camera with {:?} backend", backend);

    match backend {
        CameraBackend::ImageSequence => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| Error::Camera("Image sequence backend requires a directory".to_string()))?;
            let fps = config.capability.map(|c| c.fps);
            Ok(Box::new(image_sequence::ImageSequenceCamera::open(path, fps)?))
        }
        #[cfg(feature = "opencv")]
        CameraBackend::Opencv => Ok(Box::new(opencv_backend::OpenCvCamera::open(
            config.device,
            config.capability,
        )?)),
        #[cfg(feature = "nokhwa")]
        CameraBackend::Nokhwa => Ok(Box::new(nokhwa_backend::NokhwaCamera::open(
            config.device,
            config.capability,
        )?)),
        #[allow(unreachable_patterns)]
        other => Err(Error::Camera(format!(
            "Camera backend {other:?} is not available in this build; enable its cargo feature"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_sequence_requires_path() {
        let config = CameraConfig {
            backend: Some(CameraBackend::ImageSequence),
            ..CameraConfig::default()
        };
        assert!(matches!(open_camera(&config), Err(Error::Camera(_))));
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn test_disabled_backend_is_reported() {
        let config = CameraConfig {
            backend: Some(CameraBackend::Opencv),
            ..CameraConfig::default()
        };
        match open_camera(&config) {
            Err(Error::Camera(msg)) => assert!(msg.contains("not available")),
            _ => panic!("Expected camera error"),
        }
    }
}
