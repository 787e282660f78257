//! Conversion of one detection result into canonical tracking data.

use crate::{
    config::{BlendshapeConfig, PoseScale},
    constants::{BLENDSHAPE_SCALE, MAX_SCORE},
    detector::{Category, DetectionResult},
    name_mapper::{blink_targets, Mapping, NameMapper},
    pose::{decompose_affine, matrix_from_rows, rotation_matrix_to_euler},
    tracking_data::TrackingData,
    Result,
};
use log::debug;

/// What a call to [`FrameTransform::apply`] changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOutcome {
    /// No transformation matrix; tracking data left untouched
    NoFace,
    /// Head pose updated but no blendshape list was reported
    PoseOnly,
    /// Head pose and blendshapes updated
    Updated,
}

impl TransformOutcome {
    /// Whether the frame should be handed to the sinks
    #[must_use]
    pub fn is_complete(self) -> bool {
        self == Self::Updated
    }
}

/// Applies pose scaling, name mapping and blink merging
#[derive(Debug, Clone)]
pub struct FrameTransform {
    scale: PoseScale,
    mapper: NameMapper,
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self::new(PoseScale::default(), &BlendshapeConfig::default())
    }
}

impl FrameTransform {
    /// Create a transform from the pose and blendshape configuration
    #[must_use]
    pub fn new(scale: PoseScale, blendshapes: &BlendshapeConfig) -> Self {
        Self {
            scale,
            mapper: NameMapper::new(blendshapes.sync_eye_blink),
        }
    }

    /// Pose scale factors in use
    #[must_use]
    pub fn scale(&self) -> &PoseScale {
        &self.scale
    }

    /// Populate `data` from `result` in place
    ///
    /// A result without a transformation matrix leaves `data` untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the transformation matrix is degenerate; `data`
    /// is left untouched in that case too.
    pub fn apply(&self, result: &DetectionResult, data: &mut TrackingData) -> Result<TransformOutcome> {
        let Some(rows) = result.facial_transformation_matrixes.first() else {
            debug!("No face in frame, holding previous tracking data");
            return Ok(TransformOutcome::NoFace);
        };

        let parts = decompose_affine(&matrix_from_rows(rows))?;
        let euler = rotation_matrix_to_euler(&parts.rotation);

        data.head[0] = euler.x * self.scale.rot_x;
        data.head[1] = euler.y * self.scale.rot_y;
        data.head[2] = euler.z * self.scale.rot_z;
        data.head[3] = parts.translation.x * self.scale.pos_x;
        data.head[4] = parts.translation.y * self.scale.pos_y;
        data.head[5] = parts.translation.z * self.scale.pos_z;

        let Some(categories) = result.face_blendshapes.first() else {
            debug!("Transformation matrix without blendshapes, pose updated only");
            return Ok(TransformOutcome::PoseOnly);
        };

        self.apply_blendshapes(categories, data);
        Ok(TransformOutcome::Updated)
    }

    fn apply_blendshapes(&self, categories: &[Category], data: &mut TrackingData) {
        let mut blink_sum = 0.0;

        for category in categories {
            match self.mapper.lookup(&category.category_name) {
                Mapping::Direct(target) => data.set_blendshape(target, canonical_score(category.score)),
                Mapping::Blink(_) => blink_sum += category.score,
                Mapping::Unmapped => {}
            }
        }

        // A missing eye counts as open
        if self.mapper.sync_eye_blink() {
            let average = canonical_score(blink_sum / 2.0);
            for target in blink_targets() {
                data.set_blendshape(target, average);
            }
        }
    }
}

/// Detector score in [0, 1] to a canonical score in [0, 100]; non-finite scores map to 0
fn canonical_score(score: f64) -> f64 {
    if !score.is_finite() {
        return 0.0;
    }
    (score * BLENDSHAPE_SCALE).clamp(0.0, MAX_SCORE)
}
