use crate::WorldConfig;
use log::trace;
use nalgebra::Vector3;
use rapier3d::prelude::*;

/// Owns the rapier sets and pipeline and advances them by one fixed step at a time.
pub struct PhysicsManager {
    pub gravity: Vector3<f32>,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: Box<dyn BroadPhase>,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub physics_hooks: (),
    pub event_handler: (),
}

impl Default for PhysicsManager {
    fn default() -> Self {
        PhysicsManager::new(&WorldConfig::default())
    }
}

impl PhysicsManager {
    pub fn new(config: &WorldConfig) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.fixed_time_step;

        PhysicsManager {
            gravity: config.gravity,
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: Box::<DefaultBroadPhase>::default(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            physics_hooks: (),
            event_handler: (),
        }
    }

    /// Advances the simulation by one fixed step.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            self.broad_phase.as_mut(),
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &self.physics_hooks,
            &self.event_handler,
        );
    }

    /// Inserts a body together with the colliders attached to it.
    pub fn insert_body(&mut self, body: RigidBody, colliders: Vec<Collider>) -> RigidBodyHandle {
        let handle = self.rigid_body_set.insert(body);
        for collider in colliders {
            self.collider_set
                .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        }
        trace!(
            "Inserted body {handle:?} with {} colliders",
            self.rigid_body_set
                .get(handle)
                .map_or(0, |body| body.colliders().len())
        );
        handle
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.rigid_body_set.get_mut(handle)
    }

    /// Clears user forces and torques on the given bodies.
    pub fn reset_forces(&mut self, handles: impl IntoIterator<Item = RigidBodyHandle>) {
        for handle in handles {
            if let Some(body) = self.rigid_body_set.get_mut(handle) {
                body.reset_forces(false);
                body.reset_torques(false);
            }
        }
    }

    /// Adds a fixed half-space collider through the origin with its normal along +Y.
    pub fn add_ground_plane(&mut self) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed().build();
        let ground = ColliderBuilder::halfspace(Vector3::y_axis()).build();
        self.insert_body(body, vec![ground])
    }
}
