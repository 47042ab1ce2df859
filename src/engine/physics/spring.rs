use nalgebra::{Point3, Vector3};
use rapier3d::prelude::*;

/// A damped spring between anchor points on two bodies.
///
/// Unlike a joint, the spring is applied as a pair of external forces after every
/// sub-step, so it acts on the following one.
#[derive(Debug, Clone, PartialEq)]
pub struct Spring {
    pub body_a: RigidBodyHandle,
    pub body_b: RigidBodyHandle,
    /// Anchor on body A, in A's local frame.
    pub local_anchor_a: Point3<f32>,
    /// Anchor on body B, in B's local frame.
    pub local_anchor_b: Point3<f32>,
    pub rest_length: f32,
    pub stiffness: f32,
    pub damping: f32,
}

impl Spring {
    /// Connects two bodies at world-space anchors, converted into each body's
    /// local frame at their current poses.
    pub fn between(
        bodies: &RigidBodySet,
        body_a: RigidBodyHandle,
        body_b: RigidBodyHandle,
        world_anchor_a: Point3<f32>,
        world_anchor_b: Point3<f32>,
    ) -> Option<Self> {
        let a = bodies.get(body_a)?;
        let b = bodies.get(body_b)?;

        Some(Spring {
            body_a,
            body_b,
            local_anchor_a: a.position().inverse_transform_point(&world_anchor_a),
            local_anchor_b: b.position().inverse_transform_point(&world_anchor_b),
            rest_length: 0.0,
            stiffness: 0.0,
            damping: 0.0,
        })
    }

    pub fn with_parameters(mut self, rest_length: f32, stiffness: f32, damping: f32) -> Self {
        self.rest_length = rest_length;
        self.stiffness = stiffness;
        self.damping = damping;
        self
    }

    /// Current world-space anchors. `None` if either body is gone.
    pub fn world_anchors(&self, bodies: &RigidBodySet) -> Option<(Point3<f32>, Point3<f32>)> {
        let a = bodies.get(self.body_a)?;
        let b = bodies.get(self.body_b)?;
        Some((
            a.position() * self.local_anchor_a,
            b.position() * self.local_anchor_b,
        ))
    }

    /// Current distance between the anchors.
    pub fn length(&self, bodies: &RigidBodySet) -> Option<f32> {
        let (a, b) = self.world_anchors(bodies)?;
        Some((b - a).norm())
    }

    /// Force this spring exerts on body B at its anchor. Body A receives the opposite.
    pub fn force(&self, bodies: &RigidBodySet) -> Option<Vector3<f32>> {
        let (anchor_a, anchor_b) = self.world_anchors(bodies)?;
        let velocity_a = bodies.get(self.body_a)?.velocity_at_point(&anchor_a);
        let velocity_b = bodies.get(self.body_b)?.velocity_at_point(&anchor_b);

        Some(spring_force(
            anchor_b - anchor_a,
            velocity_b - velocity_a,
            self.rest_length,
            self.stiffness,
            self.damping,
        ))
    }

    /// Adds this spring's forces to both bodies. Returns `false` if a body is gone.
    pub fn apply_force(&self, bodies: &mut RigidBodySet) -> bool {
        let Some((anchor_a, anchor_b)) = self.world_anchors(bodies) else {
            return false;
        };
        let Some(force) = self.force(bodies) else {
            return false;
        };

        if let Some(a) = bodies.get_mut(self.body_a) {
            a.add_force_at_point(-force, anchor_a, true);
        }
        if let Some(b) = bodies.get_mut(self.body_b) {
            b.add_force_at_point(force, anchor_b, true);
        }
        true
    }
}

/// Hooke force with damping along the spring axis, acting on the B end.
///
/// `offset` points from anchor A to anchor B and `relative_velocity` is B's anchor
/// velocity minus A's. A zero-length spring has no axis and exerts no force.
pub fn spring_force(
    offset: Vector3<f32>,
    relative_velocity: Vector3<f32>,
    rest_length: f32,
    stiffness: f32,
    damping: f32,
) -> Vector3<f32> {
    let length = offset.norm();
    if length <= f32::EPSILON {
        return Vector3::zeros();
    }

    let axis = offset / length;
    let magnitude = -stiffness * (length - rest_length) - damping * relative_velocity.dot(&axis);
    axis * magnitude
}
