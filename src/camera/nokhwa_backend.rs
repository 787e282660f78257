use super::{CameraSource, Frame};
use crate::{config::Capability, Error, Result};
use log::{info, warn};
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
    Camera,
};

/// Webcam read through nokhwa's native backends (`AVFoundation`, `MSMF`, `V4L2`)
pub struct NokhwaCamera {
    camera: Camera,
}

impl NokhwaCamera {
    /// Open a device index with an optional requested format
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened or its stream started.
    pub fn open(device: u32, capability: Option<Capability>) -> Result<Self> {
        let requested = match capability {
            Some(c) => RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
                Resolution::new(c.width, c.height),
                FrameFormat::MJPEG,
                c.fps,
            ))),
            None => RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        };

        let mut camera = Camera::new(CameraIndex::Index(device), requested)
            .map_err(|e| Error::Camera(format!("Failed to create camera {device}: {e}")))?;
        camera
            .open_stream()
            .map_err(|e| Error::Camera(format!("Failed to open camera stream: {e}")))?;

        info!("Opened camera: {} ({})", camera.info().human_name(), camera.camera_format());

        Ok(Self { camera })
    }
}

impl CameraSource for NokhwaCamera {
    fn read_frame(&mut self) -> Result<Option<Frame>> {
        if !self.camera.is_stream_open() {
            return Ok(None);
        }
        let buffer = self
            .camera
            .frame()
            .map_err(|e| Error::Camera(format!("Failed to get frame: {e}")))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::Camera(format!("Failed to decode frame: {e}")))?;
        Ok(Some(decoded))
    }

    fn name(&self) -> String {
        self.camera.info().human_name()
    }

    fn release(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            warn!("Failed to stop camera stream: {}", e);
        }
    }
}
