//! Neutral-pose calibration.
//!
//! While calibrating, the user holds a relaxed face looking at the camera.
//! The mean head pose becomes the neutral offset and the mean blendshape
//! scores become per-channel baselines that are removed from later frames.

use crate::{
    constants::{HEAD_VALUES, MAX_SCORE},
    tracking_data::TrackingData,
    Error, Result,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Receives every dispatched frame and produces the data to transmit
pub trait CalibrationSink: Send {
    /// Feed the current frame's canonical data
    fn input_tracking(&mut self, data: &TrackingData);

    /// Calibrated view of the most recent frame
    fn output(&self) -> &TrackingData;
}

/// Stored neutral pose and blendshape baselines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Head values subtracted from every frame
    pub neutral_head: [f64; HEAD_VALUES],

    /// Resting score per canonical blendshape
    pub baselines: BTreeMap<String, f64>,
}

impl CalibrationProfile {
    /// Load a profile from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| Error::Calibration(format!("Failed to parse profile: {e}")))
    }

    /// Save the profile to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Write the calibrated form of `raw` into `out`
    pub fn apply(&self, raw: &TrackingData, out: &mut TrackingData) {
        out.copy_from(raw);
        for (value, neutral) in out.head.iter_mut().zip(self.neutral_head) {
            *value -= neutral;
        }
        for (name, score) in &mut out.blendshapes {
            let base = self.baselines.get(name).copied().unwrap_or(0.0);
            *score = rescale(*score, base);
        }
    }
}

/// Map [base, 100] onto [0, 100]
fn rescale(score: f64, base: f64) -> f64 {
    let span = MAX_SCORE - base;
    if span <= f64::EPSILON {
        return score;
    }
    ((score - base) * MAX_SCORE / span).clamp(0.0, MAX_SCORE)
}

#[derive(Debug)]
struct Collector {
    target: usize,
    samples: usize,
    head_sum: [f64; HEAD_VALUES],
    blendshape_sums: BTreeMap<String, (f64, usize)>,
}

impl Collector {
    fn new(target: usize) -> Self {
        Self {
            target,
            samples: 0,
            head_sum: [0.0; HEAD_VALUES],
            blendshape_sums: BTreeMap::new(),
        }
    }

    fn add(&mut self, data: &TrackingData) {
        self.samples += 1;
        for (sum, value) in self.head_sum.iter_mut().zip(data.head) {
            *sum += value;
        }
        for (name, score) in &data.blendshapes {
            let entry = self.blendshape_sums.entry(name.clone()).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }

    fn is_complete(&self) -> bool {
        self.samples >= self.target
    }

    #[allow(clippy::cast_precision_loss)] // Sample counts are small
    fn finish(&self) -> CalibrationProfile {
        let n = self.samples.max(1) as f64;
        CalibrationProfile {
            neutral_head: self.head_sum.map(|sum| sum / n),
            baselines: self
                .blendshape_sums
                .iter()
                .map(|(name, (sum, count))| (name.clone(), sum / (*count).max(1) as f64))
                .collect(),
        }
    }
}

/// Calibration sink that passes data through until a profile exists
#[derive(Debug, Default)]
pub struct Calibrator {
    profile: Option<CalibrationProfile>,
    collector: Option<Collector>,
    profile_path: Option<PathBuf>,
    output: TrackingData,
}

impl Calibrator {
    /// Create an uncalibrated calibrator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a calibrator that starts with `profile`
    #[must_use]
    pub fn with_profile(profile: CalibrationProfile) -> Self {
        Self {
            profile: Some(profile),
            ..Self::default()
        }
    }

    /// Save finished profiles to `path`; loads it first if it exists
    ///
    /// # Errors
    ///
    /// Returns an error if an existing profile cannot be read.
    pub fn persist_to<P: Into<PathBuf>>(mut self, path: P) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            info!("Loading calibration profile {}", path.display());
            self.profile = Some(CalibrationProfile::from_file(&path)?);
        }
        self.profile_path = Some(path);
        Ok(self)
    }

    /// Start averaging the next `frames` frames into a new profile
    pub fn begin(&mut self, frames: usize) {
        info!("Calibrating over {} frames, hold a neutral expression", frames);
        self.collector = Some(Collector::new(frames.max(1)));
    }

    /// Whether a calibration is in progress
    #[must_use]
    pub fn is_calibrating(&self) -> bool {
        self.collector.is_some()
    }

    /// Active profile, if any
    #[must_use]
    pub fn profile(&self) -> Option<&CalibrationProfile> {
        self.profile.as_ref()
    }

    /// Drop the active profile and pass data through
    pub fn reset(&mut self) {
        self.profile = None;
        self.collector = None;
    }

    fn complete(&mut self, profile: CalibrationProfile) {
        info!("Calibration complete");
        if let Some(path) = &self.profile_path {
            match profile.to_file(path) {
                Ok(()) => info!("Saved calibration profile to {}", path.display()),
                Err(e) => warn!("Failed to save calibration profile: {}", e),
            }
        }
        self.profile = Some(profile);
    }
}

impl CalibrationSink for Calibrator {
    fn input_tracking(&mut self, data: &TrackingData) {
        if let Some(collector) = &mut self.collector {
            collector.add(data);
            if collector.is_complete() {
                let profile = collector.finish();
                self.collector = None;
                self.complete(profile);
            }
        }

        match &self.profile {
            Some(profile) => profile.apply(data, &mut self.output),
            None => self.output.copy_from(data),
        }
    }

    fn output(&self) -> &TrackingData {
        &self.output
    }
}
