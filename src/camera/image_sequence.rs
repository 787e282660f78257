use super::{CameraSource, Frame};
use crate::{Error, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "ppm"];

/// Plays back a directory of still images in file-name order
pub struct ImageSequenceCamera {
    directory: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
    frame_interval: Option<Duration>,
    next_deadline: Option<Instant>,
}

impl ImageSequenceCamera {
    /// Open a directory; `fps` paces playback, `None` reads as fast as possible
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or holds no images.
    pub fn open<P: AsRef<Path>>(directory: P, fps: Option<u32>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        let mut files: Vec<PathBuf> = std::fs::read_dir(&directory)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(Error::Camera(format!("No images found in {}", directory.display())));
        }

        info!("Image sequence {} with {} frames", directory.display(), files.len());

        Ok(Self {
            directory,
            files,
            position: 0,
            frame_interval: fps.filter(|&f| f > 0).map(|f| Duration::from_secs_f64(1.0 / f64::from(f))),
            next_deadline: None,
        })
    }

    /// Number of frames in the sequence
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the sequence has no frames
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn pace(&mut self) {
        let Some(interval) = self.frame_interval else {
            return;
        };
        let now = Instant::now();
        if let Some(deadline) = self.next_deadline {
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
        }
        self.next_deadline = Some(self.next_deadline.map_or(now, |d| d.max(now)) + interval);
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

impl CameraSource for ImageSequenceCamera {
    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };
        let path = path.clone();
        self.position += 1;

        self.pace();
        debug!("Reading frame {}", path.display());
        Ok(Some(image::open(&path)?.to_rgb8()))
    }

    fn name(&self) -> String {
        format!("image sequence {}", self.directory.display())
    }

    fn release(&mut self) {
        self.position = self.files.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_frames(dir: &Path, count: usize) {
        for i in 0..count {
            let image = Frame::from_pixel(4, 4, image::Rgb([i as u8, 0, 0]));
            image.save(dir.join(format!("frame_{i:03}.png"))).unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "not an image").unwrap();
    }

    #[test]
    fn test_reads_frames_in_order_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 3);

        let mut camera = ImageSequenceCamera::open(dir.path(), None).unwrap();
        assert_eq!(camera.len(), 3);
        for i in 0..3 {
            let frame = camera.read_frame().unwrap().unwrap();
            assert_eq!(frame.get_pixel(0, 0)[0], i as u8);
        }
        assert!(camera.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_release_ends_stream() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 2);

        let mut camera = ImageSequenceCamera::open(dir.path(), Some(30)).unwrap();
        camera.release();
        assert!(camera.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_empty_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageSequenceCamera::open(dir.path(), None).is_err());
    }
}
