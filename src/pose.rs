//! Head pose math: affine decomposition and Euler extraction.
//!
//! Euler angles use the static (extrinsic) x-y-z convention: a rotation
//! `R = Rz(z) * Ry(y) * Rx(x)` yields `(x, y, z)` in radians. This is the
//! same convention `nalgebra::Rotation3::from_euler_angles` builds.

use crate::{constants::EPSILON, Error, Result};
use nalgebra::{Matrix3, Matrix4, Vector3};

/// Components of a 4x4 affine transform
#[derive(Debug, Clone, PartialEq)]
pub struct AffineParts {
    /// Translation column
    pub translation: Vector3<f64>,
    /// Proper rotation (determinant +1)
    pub rotation: Matrix3<f64>,
    /// Per-axis scale; a reflection shows up as a negative x scale
    pub zoom: Vector3<f64>,
    /// Shear factors (xy, xz, yz)
    pub shear: Vector3<f64>,
}

/// Build a matrix from row-major nested arrays as recorded by the detector
#[must_use]
pub fn matrix_from_rows(rows: &[[f64; 4]; 4]) -> Matrix4<f64> {
    Matrix4::from_fn(|r, c| rows[r][c])
}

/// Split an affine matrix into translation, rotation, zoom and shear
///
/// # Errors
///
/// Returns an error if the linear part is degenerate (a zero-length axis).
pub fn decompose_affine(matrix: &Matrix4<f64>) -> Result<AffineParts> {
    let translation = Vector3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
    let linear: Matrix3<f64> = matrix.fixed_view::<3, 3>(0, 0).into_owned();

    let mut x = linear.column(0).into_owned();
    let mut y = linear.column(1).into_owned();
    let mut z = linear.column(2).into_owned();

    let mut sx = x.norm();
    if sx < EPSILON {
        return Err(Error::InvalidInput("Degenerate transform: zero x axis".to_string()));
    }
    x /= sx;

    let sx_sxy = x.dot(&y);
    y -= x * sx_sxy;
    let sy = y.norm();
    if sy < EPSILON {
        return Err(Error::InvalidInput("Degenerate transform: zero y axis".to_string()));
    }
    y /= sy;

    let sx_sxz = x.dot(&z);
    let sy_syz = y.dot(&z);
    z -= x * sx_sxz + y * sy_syz;
    let sz = z.norm();
    if sz < EPSILON {
        return Err(Error::InvalidInput("Degenerate transform: zero z axis".to_string()));
    }
    z /= sz;

    let shear = Vector3::new(sx_sxy / sx, sx_sxz / sx, sy_syz / sy);

    let mut rotation = Matrix3::from_columns(&[x, y, z]);
    if rotation.determinant() < 0.0 {
        sx = -sx;
        let flipped = -rotation.column(0);
        rotation.set_column(0, &flipped);
    }

    Ok(AffineParts {
        translation,
        rotation,
        zoom: Vector3::new(sx, sy, sz),
        shear,
    })
}

/// Convert a rotation matrix to static x-y-z Euler angles in radians
#[must_use]
pub fn rotation_matrix_to_euler(rotation: &Matrix3<f64>) -> Vector3<f64> {
    let cy = (rotation[(0, 0)].powi(2) + rotation[(1, 0)].powi(2)).sqrt();

    if cy > f64::EPSILON * 4.0 {
        Vector3::new(
            rotation[(2, 1)].atan2(rotation[(2, 2)]),
            (-rotation[(2, 0)]).atan2(cy),
            rotation[(1, 0)].atan2(rotation[(0, 0)]),
        )
    } else {
        // Gimbal lock: fold z into x
        Vector3::new(
            (-rotation[(1, 2)]).atan2(rotation[(1, 1)]),
            (-rotation[(2, 0)]).atan2(cy),
            0.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;

    fn affine(rotation: Matrix3<f64>, scale: f64, translation: Vector3<f64>) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&(rotation * scale));
        m[(0, 3)] = translation.x;
        m[(1, 3)] = translation.y;
        m[(2, 3)] = translation.z;
        m
    }

    #[test]
    fn test_euler_angle_conversion() {
        let angles = rotation_matrix_to_euler(&Matrix3::identity());
        assert!(angles.x.abs() < 1e-12);
        assert!(angles.y.abs() < 1e-12);
        assert!(angles.z.abs() < 1e-12);
    }

    #[test]
    fn test_euler_matches_static_xyz_composition() {
        let rotation = Rotation3::from_euler_angles(0.1, -0.25, 0.4);
        let angles = rotation_matrix_to_euler(rotation.matrix());
        assert!((angles.x - 0.1).abs() < 1e-9);
        assert!((angles.y + 0.25).abs() < 1e-9);
        assert!((angles.z - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_euler_gimbal_lock() {
        let rotation = Rotation3::from_euler_angles(0.3, std::f64::consts::FRAC_PI_2, 0.0);
        let angles = rotation_matrix_to_euler(rotation.matrix());
        assert!((angles.y - std::f64::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(angles.z, 0.0);
        assert!(angles.x.is_finite());
    }

    #[test]
    fn test_decompose_identity() {
        let parts = decompose_affine(&Matrix4::identity()).unwrap();
        assert_eq!(parts.translation, Vector3::zeros());
        assert!((parts.rotation - Matrix3::identity()).norm() < 1e-12);
        assert!((parts.zoom - Vector3::new(1.0, 1.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn test_decompose_removes_uniform_scale() {
        let rotation = Rotation3::from_euler_angles(0.2, 0.1, -0.3);
        let m = affine(*rotation.matrix(), 2.5, Vector3::new(1.0, -2.0, -40.0));

        let parts = decompose_affine(&m).unwrap();
        assert!((parts.rotation - rotation.matrix()).norm() < 1e-9);
        assert!((parts.zoom - Vector3::new(2.5, 2.5, 2.5)).norm() < 1e-9);
        assert!(parts.shear.norm() < 1e-9);
        assert_eq!(parts.translation, Vector3::new(1.0, -2.0, -40.0));
    }

    #[test]
    fn test_decompose_reflection_goes_to_x_zoom() {
        let mut m = Matrix4::identity();
        m[(0, 0)] = -1.0;
        let parts = decompose_affine(&m).unwrap();
        assert!(parts.zoom.x < 0.0);
        assert!((parts.rotation.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_decompose_degenerate() {
        let mut m = Matrix4::identity();
        m[(1, 1)] = 0.0;
        assert!(decompose_affine(&m).is_err());
        assert!(decompose_affine(&Matrix4::zeros()).is_err());
    }

    #[test]
    fn test_matrix_from_rows_is_row_major() {
        let rows = [
            [1.0, 0.0, 0.0, 5.0],
            [0.0, 1.0, 0.0, 6.0],
            [0.0, 0.0, 1.0, 7.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let m = matrix_from_rows(&rows);
        assert_eq!(m[(0, 3)], 5.0);
        assert_eq!(m[(2, 3)], 7.0);
        assert_eq!(m[(3, 0)], 0.0);
    }
}
