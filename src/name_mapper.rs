//! Translation from MediaPipe blendshape names to iFacialMocap names.
//!
//! MediaPipe reports sides from the subject's point of view while the
//! receiver expects the mirrored camera view, so every `...Left` source name
//! maps to an `..._R` destination and vice versa. Symmetric channels such as
//! `jawForward` map to themselves.

/// Source-side blink channels that take part in blink synchronization
pub const BLINK_SOURCES: [&str; 2] = ["eyeBlinkLeft", "eyeBlinkRight"];

/// Detector name to canonical name
pub const MEDIAPIPE_TO_IFM: &[(&str, &str)] = &[
    // Brow
    ("browInnerUp", "browInnerUp"),
    ("browDownLeft", "browDown_R"),
    ("browDownRight", "browDown_L"),
    ("browOuterUpLeft", "browOuterUp_R"),
    ("browOuterUpRight", "browOuterUp_L"),
    // Eye
    ("eyeLookUpLeft", "eyeLookUp_R"),
    ("eyeLookUpRight", "eyeLookUp_L"),
    ("eyeLookDownLeft", "eyeLookDown_R"),
    ("eyeLookDownRight", "eyeLookDown_L"),
    ("eyeLookInLeft", "eyeLookIn_R"),
    ("eyeLookInRight", "eyeLookIn_L"),
    ("eyeLookOutLeft", "eyeLookOut_R"),
    ("eyeLookOutRight", "eyeLookOut_L"),
    ("eyeBlinkLeft", "eyeBlink_R"),
    ("eyeBlinkRight", "eyeBlink_L"),
    ("eyeSquintLeft", "eyeSquint_R"),
    ("eyeSquintRight", "eyeSquint_L"),
    ("eyeWideLeft", "eyeWide_R"),
    ("eyeWideRight", "eyeWide_L"),
    // Cheek
    ("cheekPuff", "cheekPuff"),
    ("cheekSquintLeft", "cheekSquint_R"),
    ("cheekSquintRight", "cheekSquint_L"),
    // Nose
    ("noseSneerLeft", "noseSneer_R"),
    ("noseSneerRight", "noseSneer_L"),
    // Jaw
    ("jawOpen", "jawOpen"),
    ("jawForward", "jawForward"),
    ("jawLeft", "jawRight"),
    ("jawRight", "jawLeft"),
    // Mouth
    ("mouthFunnel", "mouthFunnel"),
    ("mouthPucker", "mouthPucker"),
    ("mouthLeft", "mouthRight"),
    ("mouthRight", "mouthLeft"),
    ("mouthRollUpper", "mouthRollUpper"),
    ("mouthRollLower", "mouthRollLower"),
    ("mouthShrugUpper", "mouthShrugUpper"),
    ("mouthShrugLower", "mouthShrugLower"),
    ("mouthClose", "mouthClose"),
    ("mouthSmileLeft", "mouthSmile_R"),
    ("mouthSmileRight", "mouthSmile_L"),
    ("mouthFrownLeft", "mouthFrown_R"),
    ("mouthFrownRight", "mouthFrown_L"),
    ("mouthDimpleLeft", "mouthDimple_R"),
    ("mouthDimpleRight", "mouthDimple_L"),
    ("mouthUpperUpLeft", "mouthUpperUp_R"),
    ("mouthUpperUpRight", "mouthUpperUp_L"),
    ("mouthLowerDownLeft", "mouthLowerDown_R"),
    ("mouthLowerDownRight", "mouthLowerDown_L"),
    ("mouthPressLeft", "mouthPress_R"),
    ("mouthPressRight", "mouthPress_L"),
    ("mouthStretchLeft", "mouthStretch_R"),
    ("mouthStretchRight", "mouthStretch_L"),
    // Tongue
    ("tongueOut", "tongueOut"),
];

/// How a detector name should be consumed by the frame transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapping {
    /// Write the score straight into the named canonical channel
    Direct(&'static str),
    /// Accumulate into the synchronized blink value
    Blink(&'static str),
    /// No canonical counterpart; skip
    Unmapped,
}

/// Canonical name for a detector name, ignoring blink synchronization
#[must_use]
pub fn to_canonical(source: &str) -> Option<&'static str> {
    MEDIAPIPE_TO_IFM
        .iter()
        .find(|(from, _)| *from == source)
        .map(|(_, to)| *to)
}

/// Detector name for a canonical name
#[must_use]
pub fn to_source(canonical: &str) -> Option<&'static str> {
    MEDIAPIPE_TO_IFM
        .iter()
        .find(|(_, to)| *to == canonical)
        .map(|(from, _)| *from)
}

/// Iterate every (detector, canonical) pair in table order
pub fn entries() -> impl Iterator<Item = (&'static str, &'static str)> {
    MEDIAPIPE_TO_IFM.iter().copied()
}

/// Iterate every canonical name
pub fn canonical_names() -> impl Iterator<Item = &'static str> {
    MEDIAPIPE_TO_IFM.iter().map(|(_, to)| *to)
}

/// Canonical names of the two blink channels
#[must_use]
pub fn blink_targets() -> [&'static str; 2] {
    BLINK_SOURCES.map(|source| to_canonical(source).unwrap_or(source))
}

/// Whether the detector name is one of the blink channels
#[must_use]
pub fn is_blink_source(source: &str) -> bool {
    BLINK_SOURCES.contains(&source)
}

/// Lookup that classifies blink channels according to the sync setting
#[derive(Debug, Clone, Copy)]
pub struct NameMapper {
    sync_eye_blink: bool,
}

impl NameMapper {
    /// Create a mapper; with `sync_eye_blink` the blink channels are merged
    #[must_use]
    pub fn new(sync_eye_blink: bool) -> Self {
        Self { sync_eye_blink }
    }

    /// Whether blink channels are reported as [`Mapping::Blink`]
    #[must_use]
    pub fn sync_eye_blink(&self) -> bool {
        self.sync_eye_blink
    }

    /// Classify a detector name
    #[must_use]
    pub fn lookup(&self, source: &str) -> Mapping {
        match to_canonical(source) {
            Some(target) if self.sync_eye_blink && is_blink_source(source) => Mapping::Blink(target),
            Some(target) => Mapping::Direct(target),
            None => Mapping::Unmapped,
        }
    }
}

impl Default for NameMapper {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_SYNC_EYE_BLINK)
    }
}
