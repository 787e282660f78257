use super::{CameraSource, Frame};
use crate::{config::Capability, utils::safe_cast::u32_to_i32, Error, Result};
use log::{info, warn};
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};

/// Webcam read through `OpenCV`
pub struct OpenCvCamera {
    capture: VideoCapture,
    device: u32,
    frame: Mat,
}

impl OpenCvCamera {
    /// Open a device index with an optional requested format
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened.
    pub fn open(device: u32, capability: Option<Capability>) -> Result<Self> {
        info!("Opening camera {} with OpenCV", device);
        let mut capture = VideoCapture::new(u32_to_i32(device)?, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(Error::Camera(format!("OpenCV could not open camera {device}")));
        }

        // Keep only the newest frame queued for low latency
        capture.set(CAP_PROP_BUFFERSIZE, 1.0)?;

        if let Some(capability) = capability {
            capture.set(CAP_PROP_FRAME_WIDTH, f64::from(capability.width))?;
            capture.set(CAP_PROP_FRAME_HEIGHT, f64::from(capability.height))?;
            capture.set(CAP_PROP_FPS, f64::from(capability.fps))?;
        }

        info!(
            "Camera {} opened at {}x{}",
            device,
            capture.get(CAP_PROP_FRAME_WIDTH)?,
            capture.get(CAP_PROP_FRAME_HEIGHT)?
        );

        Ok(Self {
            capture,
            device,
            frame: Mat::default(),
        })
    }
}

impl CameraSource for OpenCvCamera {
    fn read_frame(&mut self) -> Result<Option<Frame>> {
        if !self.capture.read(&mut self.frame)? || self.frame.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&self.frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        let width = u32::try_from(rgb.cols()).map_err(|_| Error::Camera("Negative frame width".to_string()))?;
        let height = u32::try_from(rgb.rows()).map_err(|_| Error::Camera("Negative frame height".to_string()))?;
        let bytes = rgb.data_bytes()?.to_vec();

        Frame::from_raw(width, height, bytes)
            .map(Some)
            .ok_or_else(|| Error::Camera("Frame buffer size does not match its dimensions".to_string()))
    }

    fn name(&self) -> String {
        format!("OpenCV camera {}", self.device)
    }

    fn release(&mut self) {
        if let Err(e) = self.capture.release() {
            warn!("Failed to release camera {}: {}", self.device, e);
        }
    }
}
