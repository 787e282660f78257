//! Canonical tracking data handed to calibration and transport.

use crate::constants::{HEAD_VALUES, MAX_SCORE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index of each value in [`TrackingData::head`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadAxis {
    /// Rotation about x
    RotX = 0,
    /// Rotation about y
    RotY = 1,
    /// Rotation about z
    RotZ = 2,
    /// Translation along x
    PosX = 3,
    /// Translation along y
    PosY = 4,
    /// Translation along z
    PosZ = 5,
}

/// Current frame state in the receiver's conventions.
///
/// One instance is kept per dispatcher and mutated in place every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingData {
    /// Rotation (x, y, z) followed by translation (x, y, z)
    pub head: [f64; HEAD_VALUES],

    /// Canonical blendshape name to score in [0, 100]
    pub blendshapes: BTreeMap<String, f64>,

    /// Tracking quality in [0, 100]
    pub confidence: f64,
}

impl Default for TrackingData {
    fn default() -> Self {
        Self {
            head: [0.0; HEAD_VALUES],
            blendshapes: BTreeMap::new(),
            // MediaPipe does not report a confidence
            confidence: MAX_SCORE,
        }
    }
}

impl TrackingData {
    /// Create empty tracking data with full confidence
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one head value
    #[must_use]
    pub fn head_value(&self, axis: HeadAxis) -> f64 {
        self.head[axis as usize]
    }

    /// Score for a canonical blendshape, if one has been written
    #[must_use]
    pub fn blendshape(&self, name: &str) -> Option<f64> {
        self.blendshapes.get(name).copied()
    }

    /// Write a canonical blendshape score
    pub fn set_blendshape(&mut self, name: &str, score: f64) {
        // Avoid reallocating the key on every frame once the channel exists
        if let Some(slot) = self.blendshapes.get_mut(name) {
            *slot = score;
        } else {
            self.blendshapes.insert(name.to_string(), score);
        }
    }

    /// Copy every field from `other` into `self`, reusing existing allocations
    pub fn copy_from(&mut self, other: &Self) {
        self.head = other.head;
        self.confidence = other.confidence;
        for (name, score) in &other.blendshapes {
            self.set_blendshape(name, *score);
        }
        self.blendshapes.retain(|name, _| other.blendshapes.contains_key(name));
    }
}
