//! Face landmark detector integration.
//!
//! The landmark model itself is external. [`LandmarkModel`] is the seam a
//! concrete model plugs into; [`AsyncDetector`] runs it on a worker thread and
//! delivers one [`Detection`] per accepted frame over a channel, mirroring a
//! live-stream detector with a result callback.

use crate::{
    camera::Frame,
    constants::DETECTOR_QUEUE_CAPACITY,
    Error, Result,
};
use crossbeam_channel::{bounded, Sender, TrySendError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::thread::{self, JoinHandle};

/// One scored blendshape as reported by the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Detector-side blendshape name
    pub category_name: String,
    /// Score in [0, 1]
    pub score: f64,
}

impl Category {
    /// Create a category
    pub fn new(category_name: impl Into<String>, score: f64) -> Self {
        Self {
            category_name: category_name.into(),
            score,
        }
    }
}

/// Output of one detector invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionResult {
    /// Row-major 4x4 head transforms, one per detected face
    pub facial_transformation_matrixes: Vec<[[f64; 4]; 4]>,
    /// Blendshape lists, one per detected face
    pub face_blendshapes: Vec<Vec<Category>>,
}

impl DetectionResult {
    /// Result for a single face
    #[must_use]
    pub fn single_face(matrix: [[f64; 4]; 4], blendshapes: &[(&str, f64)]) -> Self {
        Self {
            facial_transformation_matrixes: vec![matrix],
            face_blendshapes: vec![blendshapes
                .iter()
                .map(|(name, score)| Category::new(*name, *score))
                .collect()],
        }
    }

    /// Whether the detector found no face this frame
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facial_transformation_matrixes.is_empty()
    }
}

/// A completed detection, delivered once per accepted submission
#[derive(Debug, Clone)]
pub struct Detection {
    /// Detector output
    pub result: DetectionResult,
    /// The frame the result belongs to
    pub image: Frame,
    /// Timestamp the frame was submitted with
    pub timestamp_ms: u64,
}

/// Synchronous landmark model run by the detector worker
pub trait LandmarkModel: Send {
    /// Run inference on one frame
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails for this frame.
    fn detect(&mut self, image: &Frame, timestamp_ms: u64) -> Result<DetectionResult>;

    /// Get model name
    fn name(&self) -> &str;
}

/// Outcome of [`AsyncDetector::submit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The frame was queued for detection
    Accepted,
    /// The detector is still busy; the frame was dropped
    Busy,
}

struct FrameJob {
    image: Frame,
    timestamp_ms: u64,
}

/// Runs a [`LandmarkModel`] on its own thread
pub struct AsyncDetector {
    jobs: Option<Sender<FrameJob>>,
    worker: Option<JoinHandle<()>>,
    last_timestamp_ms: Option<u64>,
}

impl AsyncDetector {
    /// Start the worker; completions are sent to `completions`
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned.
    pub fn spawn(mut model: Box<dyn LandmarkModel>, completions: Sender<Detection>) -> Result<Self> {
        let (jobs_tx, jobs_rx) = bounded::<FrameJob>(DETECTOR_QUEUE_CAPACITY);
        info!("Starting detector worker for model {}", model.name());

        let worker = thread::Builder::new()
            .name("landmark-detector".to_string())
            .spawn(move || {
                for job in &jobs_rx {
                    let result = match model.detect(&job.image, job.timestamp_ms) {
                        Ok(result) => result,
                        Err(e) => {
                            warn!("Detection failed for frame at {} ms: {}", job.timestamp_ms, e);
                            continue;
                        }
                    };
                    let detection = Detection {
                        result,
                        image: job.image,
                        timestamp_ms: job.timestamp_ms,
                    };
                    if completions.send(detection).is_err() {
                        debug!("Completion receiver dropped, stopping detector worker");
                        break;
                    }
                }
                debug!("Detector worker exiting");
            })
            .map_err(|e| Error::Thread(format!("Failed to spawn detector worker: {e}")))?;

        Ok(Self {
            jobs: Some(jobs_tx),
            worker: Some(worker),
            last_timestamp_ms: None,
        })
    }

    /// Queue a frame without blocking
    ///
    /// # Errors
    ///
    /// Returns an error if `timestamp_ms` does not exceed the last accepted
    /// timestamp, or if the detector has been closed or its worker stopped.
    pub fn submit(&mut self, image: Frame, timestamp_ms: u64) -> Result<Submission> {
        let jobs = self.checked_jobs(timestamp_ms)?;

        match jobs.try_send(FrameJob { image, timestamp_ms }) {
            Ok(()) => {
                self.last_timestamp_ms = Some(timestamp_ms);
                Ok(Submission::Accepted)
            }
            Err(TrySendError::Full(_)) => Ok(Submission::Busy),
            Err(TrySendError::Disconnected(_)) => {
                Err(Error::Detector("Detector worker has stopped".to_string()))
            }
        }
    }

    /// Queue a frame, waiting until the detector has room for it
    ///
    /// # Errors
    ///
    /// Same conditions as [`submit`](Self::submit).
    pub fn submit_blocking(&mut self, image: Frame, timestamp_ms: u64) -> Result<()> {
        let jobs = self.checked_jobs(timestamp_ms)?;
        jobs.send(FrameJob { image, timestamp_ms })
            .map_err(|_| Error::Detector("Detector worker has stopped".to_string()))?;
        self.last_timestamp_ms = Some(timestamp_ms);
        Ok(())
    }

    fn checked_jobs(&self, timestamp_ms: u64) -> Result<&Sender<FrameJob>> {
        if let Some(previous) = self.last_timestamp_ms {
            if timestamp_ms <= previous {
                return Err(Error::NonMonotonicTimestamp {
                    previous,
                    current: timestamp_ms,
                });
            }
        }
        self.jobs
            .as_ref()
            .ok_or_else(|| Error::Detector("Detector is closed".to_string()))
    }

    /// Last timestamp accepted by [`submit`](Self::submit)
    #[must_use]
    pub fn last_timestamp_ms(&self) -> Option<u64> {
        self.last_timestamp_ms
    }

    /// Stop accepting frames and wait for the worker to drain
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread panicked.
    pub fn close(&mut self) -> Result<()> {
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| Error::Thread("Detector worker panicked".to_string()))?;
            info!("Detector closed");
        }
        Ok(())
    }
}

impl Drop for AsyncDetector {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Error while closing detector: {}", e);
        }
    }
}

/// Replays recorded detection results, one per frame
pub struct ReplayModel {
    results: Vec<DetectionResult>,
    position: usize,
    looped: bool,
}

impl ReplayModel {
    /// Replay the given results in order
    #[must_use]
    pub fn new(results: Vec<DetectionResult>, looped: bool) -> Self {
        Self {
            results,
            position: 0,
            looped,
        }
    }

    /// Load results from a JSON-lines file; blank lines are skipped
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is not a valid
    /// detection result.
    pub fn from_file<P: AsRef<Path>>(path: P, looped: bool) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading recorded detections from {}", path.display());

        let reader = BufReader::new(File::open(path)?);
        let mut results = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let result: DetectionResult = serde_json::from_str(&line).map_err(|e| {
                Error::Detector(format!("{}:{}: {}", path.display(), index + 1, e))
            })?;
            results.push(result);
        }

        info!("Loaded {} recorded detections", results.len());
        Ok(Self::new(results, looped))
    }

    /// Number of recorded results
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether there is nothing to replay
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl LandmarkModel for ReplayModel {
    fn detect(&mut self, _image: &Frame, _timestamp_ms: u64) -> Result<DetectionResult> {
        if self.position >= self.results.len() {
            if !self.looped || self.results.is_empty() {
                // Past the recording: behave like a detector that sees no face
                return Ok(DetectionResult::default());
            }
            self.position = 0;
        }
        let result = self.results[self.position].clone();
        self.position += 1;
        Ok(result)
    }

    fn name(&self) -> &str {
        "ReplayModel"
    }
}
