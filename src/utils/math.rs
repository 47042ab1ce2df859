use nalgebra::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};
use std::f32::consts::FRAC_PI_2;

/// Quaternions shorter than this are rejected instead of normalized.
pub const MIN_QUATERNION_NORM: f32 = 1e-6;

pub fn vec3_from_array([x, y, z]: [f32; 3]) -> Vector3<f32> {
    Vector3::new(x, y, z)
}

pub fn point3_from_array([x, y, z]: [f32; 3]) -> Point3<f32> {
    Point3::new(x, y, z)
}

/// Builds a rotation from an `[x, y, z, w]` array, the component order used by
/// the asset files. Returns `None` for a (near) zero or non-finite quaternion.
pub fn quat_from_array([x, y, z, w]: [f32; 4]) -> Option<UnitQuaternion<f32>> {
    let q = Quaternion::new(w, x, y, z);
    let norm = q.norm();
    if !norm.is_finite() || norm < MIN_QUATERNION_NORM {
        return None;
    }
    Some(UnitQuaternion::from_quaternion(q))
}

/// -90° about X. Turns +Z into +Y and +Y into -Z.
pub fn tilt_x() -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2)
}

/// -90° about Z. Turns +Y into +X.
pub fn tilt_z() -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -FRAC_PI_2)
}

pub fn isometry(position: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Isometry3<f32> {
    Isometry3::from_parts(Translation3::from(position), rotation)
}

pub trait DeltaTimeExt {
    /// Clamps a frame delta into `[0, max]`, mapping NaN to zero.
    fn clamp_delta(self, max: Self) -> Self;
}

impl DeltaTimeExt for f32 {
    fn clamp_delta(self, max: f32) -> f32 {
        if self.is_nan() {
            return 0.0;
        }
        self.clamp(0.0, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quaternion_array_order_is_xyzw() {
        let q = quat_from_array([0.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(q, UnitQuaternion::identity());

        let half_turn_y = quat_from_array([0.0, 1.0, 0.0, 0.0]).unwrap();
        let rotated = half_turn_y * Vector3::x();
        assert!((rotated - Vector3::new(-1.0, 0.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn zero_quaternion_is_rejected() {
        assert!(quat_from_array([0.0; 4]).is_none());
        assert!(quat_from_array([f32::NAN, 0.0, 0.0, 1.0]).is_none());
        assert!(quat_from_array([f32::INFINITY, 0.0, 0.0, 1.0]).is_none());
    }

    #[test]
    fn tilts_move_the_expected_axes() {
        assert!((tilt_x() * Vector3::z() - Vector3::y()).norm() < 1e-6);
        assert!((tilt_z() * Vector3::y() - Vector3::x()).norm() < 1e-6);
    }

    #[test]
    fn clamp_delta_handles_stalls_and_garbage() {
        assert_eq!(5.0_f32.clamp_delta(0.1), 0.1);
        assert_eq!((-1.0_f32).clamp_delta(0.1), 0.0);
        assert_eq!(f32::NAN.clamp_delta(0.1), 0.0);
        assert_eq!(0.05_f32.clamp_delta(0.1), 0.05);
    }
}
