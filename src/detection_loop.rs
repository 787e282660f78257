//! Capture, detect and dispatch.
//!
//! Three threads cooperate:
//! - the capture loop (the caller's thread) reads frames and submits them,
//! - the detector worker runs the landmark model,
//! - the dispatcher owns the [`TrackingData`] and feeds the sinks.
//!
//! The capture loop never waits for a completion.

use crate::{
    calibration::CalibrationSink,
    camera::CameraSource,
    constants::DISPATCH_QUEUE_CAPACITY,
    detector::{AsyncDetector, Detection, LandmarkModel, Submission},
    frame_transform::{FrameTransform, TransformOutcome},
    tracking_data::TrackingData,
    transport::TransportSink,
    utils::safe_cast::duration_to_millis,
    Error, Result,
};
use crossbeam_channel::{bounded, Receiver};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Detection loop states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Not started
    Idle,
    /// Reading the next frame
    CaptureFrame,
    /// A frame was handed to the detector
    AwaitDetection,
    /// Terminal; resources released
    Closing,
}

/// Why the loop reached [`LoopState::Closing`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The camera has no more frames
    EndOfStream,
    /// The camera failed while reading
    ReadFailure,
    /// Shutdown was requested
    Interrupted,
    /// The detector refused further frames
    DetectorStopped,
}

/// Counters reported by the dispatcher when it exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Completions received
    pub received: u64,
    /// Completions older than an already applied one
    pub stale: u64,
    /// Completions without a face
    pub no_face: u64,
    /// Frames handed to the sinks
    pub dispatched: u64,
    /// Transport sends that failed
    pub send_failures: u64,
}

/// Counters for one run of the detection loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    /// Frames read from the camera
    pub frames_captured: u64,
    /// Frames accepted by the detector
    pub submitted: u64,
    /// Frames dropped because the detector was busy
    pub dropped: u64,
    /// Dispatcher counters
    pub dispatch: DispatchStats,
    /// Why the loop stopped
    pub exit_reason: ExitReason,
}

/// Strictly increasing millisecond clock for detector timestamps
#[derive(Debug)]
pub struct MonotonicClock {
    start: Instant,
    last: Option<u64>,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Start counting from now
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            last: None,
        }
    }

    /// Milliseconds since start, always greater than the previous reading
    pub fn now_ms(&mut self) -> u64 {
        let elapsed = duration_to_millis(self.start.elapsed());
        self.advance(elapsed)
    }

    fn advance(&mut self, raw: u64) -> u64 {
        let next = match self.last {
            Some(last) if raw <= last => last.saturating_add(1),
            _ => raw,
        };
        self.last = Some(next);
        next
    }
}

/// Shared flag requesting the loop to close
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    /// Create an unset signal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Request shutdown on Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns an error if a handler is already installed for this process.
    pub fn install_ctrlc_handler(&self) -> Result<()> {
        let signal = self.clone();
        ctrlc::set_handler(move || {
            info!("Interrupt received, shutting down");
            signal.request();
        })
        .map_err(|e| Error::Thread(format!("Failed to install Ctrl-C handler: {e}")))
    }
}

/// Turns completions into tracking data and feeds the sinks
pub struct Dispatcher {
    transform: FrameTransform,
    data: TrackingData,
    calibration: Box<dyn CalibrationSink>,
    transport: Box<dyn TransportSink>,
    last_applied_ms: Option<u64>,
    stats: DispatchStats,
}

impl Dispatcher {
    /// Create a dispatcher with empty tracking data
    #[must_use]
    pub fn new(
        transform: FrameTransform,
        calibration: Box<dyn CalibrationSink>,
        transport: Box<dyn TransportSink>,
    ) -> Self {
        Self {
            transform,
            data: TrackingData::new(),
            calibration,
            transport,
            last_applied_ms: None,
            stats: DispatchStats::default(),
        }
    }

    /// Handle one completion; returns `None` for a stale completion
    pub fn handle(&mut self, detection: &Detection) -> Option<TransformOutcome> {
        self.stats.received += 1;

        if let Some(last) = self.last_applied_ms {
            if detection.timestamp_ms <= last {
                debug!(
                    "Discarding stale detection at {} ms (applied {} ms)",
                    detection.timestamp_ms, last
                );
                self.stats.stale += 1;
                return None;
            }
        }
        self.last_applied_ms = Some(detection.timestamp_ms);

        let outcome = match self.transform.apply(&detection.result, &mut self.data) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Skipping detection at {} ms: {}", detection.timestamp_ms, e);
                self.stats.no_face += 1;
                return Some(TransformOutcome::NoFace);
            }
        };

        match outcome {
            TransformOutcome::NoFace => self.stats.no_face += 1,
            TransformOutcome::PoseOnly => {}
            TransformOutcome::Updated => self.dispatch(),
        }
        Some(outcome)
    }

    fn dispatch(&mut self) {
        self.calibration.input_tracking(&self.data);
        self.stats.dispatched += 1;
        if let Err(e) = self.transport.send(self.calibration.output()) {
            self.stats.send_failures += 1;
            warn!("Failed to send tracking data: {}", e);
        }
    }

    /// Current uncalibrated tracking data
    #[must_use]
    pub fn data(&self) -> &TrackingData {
        &self.data
    }

    /// Counters so far
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Handle completions until every sender is gone
    pub fn run(mut self, completions: &Receiver<Detection>) -> DispatchStats {
        for detection in completions {
            self.handle(&detection);
        }
        debug!("Dispatcher exiting after {} completions", self.stats.received);
        self.stats
    }

    /// Run on a dedicated thread
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(self, completions: Receiver<Detection>) -> Result<JoinHandle<DispatchStats>> {
        thread::Builder::new()
            .name("tracking-dispatcher".to_string())
            .spawn(move || self.run(&completions))
            .map_err(|e| Error::Thread(format!("Failed to spawn dispatcher: {e}")))
    }
}

/// Capture loop driving camera, detector and dispatcher
pub struct DetectionLoop {
    camera: Box<dyn CameraSource>,
    detector: AsyncDetector,
    dispatcher: Option<JoinHandle<DispatchStats>>,
    clock: MonotonicClock,
    shutdown: ShutdownSignal,
    wait_for_detector: bool,
    state: LoopState,
    frames_captured: u64,
    submitted: u64,
    dropped: u64,
    dispatch: DispatchStats,
    exit_reason: Option<ExitReason>,
}

impl DetectionLoop {
    /// Start the detector worker and dispatcher thread
    ///
    /// # Errors
    ///
    /// Returns an error if either thread cannot be spawned.
    pub fn new(
        camera: Box<dyn CameraSource>,
        model: Box<dyn LandmarkModel>,
        dispatcher: Dispatcher,
        shutdown: ShutdownSignal,
    ) -> Result<Self> {
        let (completions_tx, completions_rx) = bounded(DISPATCH_QUEUE_CAPACITY);
        let detector = AsyncDetector::spawn(model, completions_tx)?;
        let dispatcher = dispatcher.spawn(completions_rx)?;
        info!("Detection loop ready with {}", camera.name());

        Ok(Self {
            camera,
            detector,
            dispatcher: Some(dispatcher),
            clock: MonotonicClock::new(),
            shutdown,
            wait_for_detector: false,
            state: LoopState::Idle,
            frames_captured: 0,
            submitted: 0,
            dropped: 0,
            dispatch: DispatchStats::default(),
            exit_reason: None,
        })
    }

    /// Wait for the detector instead of dropping frames while it is busy
    ///
    /// Recorded input should be processed frame by frame; live cameras
    /// should keep the default.
    #[must_use]
    pub fn wait_for_detector(mut self, wait: bool) -> Self {
        self.wait_for_detector = wait;
        self
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Perform one state transition
    pub fn step(&mut self) -> LoopState {
        if self.state != LoopState::Closing && self.shutdown.is_requested() {
            self.close(ExitReason::Interrupted);
            return self.state;
        }

        match self.state {
            LoopState::Idle => {
                info!("Starting detection loop");
                self.state = LoopState::CaptureFrame;
            }
            LoopState::CaptureFrame => self.capture(),
            LoopState::AwaitDetection => self.state = LoopState::CaptureFrame,
            LoopState::Closing => {}
        }
        self.state
    }

    fn capture(&mut self) {
        let frame = match self.camera.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("End of stream reached");
                self.close(ExitReason::EndOfStream);
                return;
            }
            Err(e) => {
                warn!("Failed to read frame: {}", e);
                self.close(ExitReason::ReadFailure);
                return;
            }
        };
        self.frames_captured += 1;

        let timestamp_ms = self.clock.now_ms();
        let submission = if self.wait_for_detector {
            self.detector
                .submit_blocking(frame, timestamp_ms)
                .map(|()| Submission::Accepted)
        } else {
            self.detector.submit(frame, timestamp_ms)
        };

        match submission {
            Ok(Submission::Accepted) => {
                self.submitted += 1;
                self.state = LoopState::AwaitDetection;
            }
            Ok(Submission::Busy) => {
                self.dropped += 1;
                debug!("Detector busy, dropped frame at {} ms", timestamp_ms);
            }
            Err(e) => {
                warn!("Detector rejected frame: {}", e);
                self.close(ExitReason::DetectorStopped);
            }
        }
    }

    fn close(&mut self, reason: ExitReason) {
        info!("Closing detection loop: {:?}", reason);
        self.state = LoopState::Closing;
        if self.exit_reason.is_none() {
            self.exit_reason = Some(reason);
        }

        self.camera.release();
        if let Err(e) = self.detector.close() {
            warn!("Error while closing detector: {}", e);
        }
        // The dispatcher stops once the detector has dropped its sender
        if let Some(dispatcher) = self.dispatcher.take() {
            match dispatcher.join() {
                Ok(stats) => self.dispatch = stats,
                Err(_) => warn!("Dispatcher thread panicked"),
            }
        }
    }

    /// Run until the loop closes
    #[must_use]
    pub fn run(mut self) -> LoopSummary {
        while self.step() != LoopState::Closing {}

        let summary = LoopSummary {
            frames_captured: self.frames_captured,
            submitted: self.submitted,
            dropped: self.dropped,
            dispatch: self.dispatch,
            exit_reason: self.exit_reason.unwrap_or(ExitReason::Interrupted),
        };
        info!(
            "Detection loop finished: {} frames captured, {} submitted, {} dropped, {} dispatched",
            summary.frames_captured, summary.submitted, summary.dropped, summary.dispatch.dispatched
        );
        summary
    }
}

impl Drop for DetectionLoop {
    fn drop(&mut self) {
        if self.state != LoopState::Closing {
            self.close(ExitReason::Interrupted);
        }
    }
}
