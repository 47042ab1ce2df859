use crate::utils::math::isometry;
use nalgebra::{Isometry3, UnitQuaternion, Vector3};

/// Stores the translation, rotation and scale of a [`SceneNode`](crate::core::SceneNode).
///
/// Scene nodes are not parented, so this is also the world transform. Scale is
/// carried for the renderer only; physics bodies ignore it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pos: Vector3<f32>,
    rot: UnitQuaternion<f32>,
    scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Transform::new()
    }
}

impl Transform {
    /// Creates a transform at the origin with no rotation and a uniform scale of `1.0`.
    pub fn new() -> Self {
        Transform {
            pos: Vector3::zeros(),
            rot: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_parts(position: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Transform {
            pos: position,
            rot: rotation,
            ..Transform::new()
        }
    }

    #[inline(always)]
    pub fn set_position(&mut self, x: f32, y: f32, z: f32) {
        self.set_position_vec(Vector3::new(x, y, z))
    }

    pub fn set_position_vec(&mut self, pos: Vector3<f32>) {
        self.pos = pos;
    }

    pub fn position(&self) -> Vector3<f32> {
        self.pos
    }

    pub fn set_rotation(&mut self, rotation: UnitQuaternion<f32>) {
        self.rot = rotation;
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        self.rot
    }

    pub fn set_scale_vec(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
    }

    pub fn set_uniform_scale(&mut self, factor: f32) {
        self.scale = Vector3::new(factor, factor, factor);
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.pos += delta;
    }

    /// Position and rotation as a rigid transform.
    pub fn isometry(&self) -> Isometry3<f32> {
        isometry(self.pos, self.rot)
    }

    /// Overwrites position and rotation, keeping the scale.
    pub fn set_isometry(&mut self, iso: &Isometry3<f32>) {
        self.pos = iso.translation.vector;
        self.rot = iso.rotation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isometry_round_trip_keeps_scale() {
        let mut t = Transform::new();
        t.set_uniform_scale(2.0);

        let rot = UnitQuaternion::from_euler_angles(0.0, 1.0, 0.0);
        let iso = isometry(Vector3::new(1.0, 2.0, 3.0), rot);
        t.set_isometry(&iso);

        assert_eq!(t.position(), Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(t.rotation(), rot);
        assert_eq!(t.scale(), Vector3::new(2.0, 2.0, 2.0));
        assert_eq!(t.isometry(), iso);
    }

    #[test]
    fn translate_accumulates() {
        let mut t = Transform::new();
        t.set_position(1.0, 2.0, 3.0);
        t.translate(Vector3::new(1.0, -1.0, 0.5));
        assert_eq!(t.position(), Vector3::new(2.0, 1.0, 3.5));
    }
}
