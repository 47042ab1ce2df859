//! The [`World`] binds a [`Scene`] to a physics simulation.
//!
//! It starts out `Loading` while the shape asset is fetched in the background and
//! still steps the (body-less) simulation in that state. Once the shapes arrive, every
//! body and spring declared in the scene is validated first and then created in one
//! go, and the world becomes `Ready`. From then on each fixed sub-step is followed by
//! an ordered list of post-step entries: body transforms are copied onto their scene
//! nodes and spring forces are applied for the next sub-step.

use crate::WorldConfig;
use crate::assets::{LoadError, PendingShapes, ShapeLibrary, ShapePlacement, ShapeSource};
use crate::core::{NodeId, Scene, Transform};
use crate::physics::{PhysicsManager, Spring, distribute_mass};
use crate::utils::math::{DeltaTimeExt, point3_from_array};
use log::{debug, error, info, trace, warn};
use nalgebra::{Isometry3, Point3};
use rapier3d::prelude::*;
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use std::collections::HashMap;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)))]
pub enum WorldError {
    #[snafu(display("Node {node:?} uses unknown shape {shape:?}"))]
    UnknownShape { node: String, shape: String },

    #[snafu(display("Spring {spring:?} references unknown body {name:?}"))]
    UnknownBody { spring: String, name: String },

    #[snafu(display("Body name {name:?} is declared more than once"))]
    DuplicateName { name: String },

    #[snafu(display("Node {node:?} has invalid mass {mass}"))]
    InvalidMass { node: String, mass: f32 },

    #[snafu(display("Node {node:?}: {kind} collider of shape {shape:?} is degenerate"))]
    DegenerateCollider {
        node: String,
        shape: String,
        kind: &'static str,
    },

    #[snafu(display("Shapes could not be loaded: {source}"))]
    Load { source: LoadError },
}

/// A rigid body created for a scene node.
#[derive(Debug, Clone)]
pub struct PhysicsBody {
    pub handle: RigidBodyHandle,
    /// The scene node this body drives.
    pub node: NodeId,
    pub name: Option<String>,
    /// Shape library key the colliders were built from.
    pub shape: String,
    pub mass: f32,
    pub placements: Vec<ShapePlacement>,
}

/// Work done after every sub-step, in order.
#[derive(Debug, Clone)]
pub enum StepEntry {
    /// Copy the body pose onto the scene node.
    Sync { body: RigidBodyHandle, node: NodeId },
    /// Apply the spring force for the next sub-step.
    Spring(Spring),
}

/// Everything created once the shapes are available.
#[derive(Debug, Default)]
pub struct Population {
    bodies: Vec<PhysicsBody>,
    names: HashMap<String, usize>,
    entries: Vec<StepEntry>,
}

impl Population {
    pub fn bodies(&self) -> &[PhysicsBody] {
        &self.bodies
    }

    pub fn body_by_name(&self, name: &str) -> Option<&PhysicsBody> {
        self.names.get(name).map(|&i| &self.bodies[i])
    }

    pub fn entries(&self) -> &[StepEntry] {
        &self.entries
    }

    pub fn springs(&self) -> impl Iterator<Item = &Spring> {
        self.entries.iter().filter_map(|entry| match entry {
            StepEntry::Spring(spring) => Some(spring),
            StepEntry::Sync { .. } => None,
        })
    }
}

pub enum WorldState {
    /// Waiting for the shape asset; the simulation runs without scene bodies.
    Loading(PendingShapes),
    Ready(Population),
    /// Loading or wiring failed; the simulation keeps running without scene bodies.
    Failed(WorldError),
}

impl WorldState {
    pub fn name(&self) -> &'static str {
        match self {
            WorldState::Loading(_) => "loading",
            WorldState::Ready(_) => "ready",
            WorldState::Failed(_) => "failed",
        }
    }
}

/// Central structure representing the running simulation.
pub struct World {
    config: WorldConfig,
    scene: Scene,
    /// Physics simulation system
    physics: PhysicsManager,
    state: WorldState,
    /// Simulated time not yet consumed by a sub-step
    accumulator: f32,
    steps: u64,
    elapsed: f64,
}

impl World {
    /// Creates a world and starts loading its shapes in the background.
    ///
    /// Returns immediately. Bodies and springs appear during a later [`World::update`]
    /// once the load has finished.
    pub fn new<S: ShapeSource>(scene: Scene, source: S, config: WorldConfig) -> Self {
        debug!("Creating world with {} scene nodes", scene.len());
        let pending = PendingShapes::spawn(source);
        World::empty(scene, config, WorldState::Loading(pending))
    }

    /// Creates a world from shapes that are already imported. The world is ready
    /// right away.
    pub fn with_shapes(
        scene: Scene,
        library: &ShapeLibrary,
        config: WorldConfig,
    ) -> Result<Self, WorldError> {
        let mut world = World::empty(scene, config, WorldState::Ready(Population::default()));
        let population = world.populate(library)?;
        world.become_ready(population);
        Ok(world)
    }

    fn empty(scene: Scene, config: WorldConfig, state: WorldState) -> Self {
        let mut physics = PhysicsManager::new(&config);
        if config.ground_plane {
            physics.add_ground_plane();
        }

        World {
            config,
            scene,
            physics,
            state,
            accumulator: 0.0,
            steps: 0,
            elapsed: 0.0,
        }
    }

    /// Advances the simulation by `delta_time` seconds of wall-clock time.
    ///
    /// The delta is clamped to `max_delta_time` and consumed in fixed sub-steps, at most
    /// `max_sub_steps` per call. Returns the number of sub-steps taken.
    pub fn update(&mut self, delta_time: f32) -> u32 {
        self.poll_shapes();

        let step = self.config.fixed_time_step;
        self.accumulator += delta_time.clamp_delta(self.config.max_delta_time);

        let mut sub_steps = 0;
        while self.accumulator >= step && sub_steps < self.config.max_sub_steps {
            self.sub_step();
            self.accumulator -= step;
            sub_steps += 1;
        }

        if self.accumulator >= step {
            warn!(
                "Sub-step budget of {} exhausted, dropping {:.3}s of simulation time",
                self.config.max_sub_steps, self.accumulator
            );
            self.accumulator = 0.0;
        }

        sub_steps
    }

    fn sub_step(&mut self) {
        self.physics.step();
        self.steps += 1;
        self.elapsed += f64::from(self.config.fixed_time_step);

        let WorldState::Ready(population) = &self.state else {
            return;
        };

        self.physics
            .reset_forces(population.bodies.iter().map(|body| body.handle));

        for entry in &population.entries {
            match entry {
                StepEntry::Sync { body, node } => {
                    let (Some(rb), Some(node)) = (self.physics.body(*body), self.scene.get_mut(*node))
                    else {
                        continue;
                    };
                    node.transform.set_isometry(rb.position());
                }
                StepEntry::Spring(spring) => {
                    if !spring.apply_force(&mut self.physics.rigid_body_set) {
                        trace!("Skipping spring with a missing body");
                    }
                }
            }
        }
    }

    fn poll_shapes(&mut self) {
        let WorldState::Loading(pending) = &self.state else {
            return;
        };
        let Some(result) = pending.try_take() else {
            return;
        };
        self.finish_loading(result);
    }

    /// Blocks until the shape load has finished and wires the scene.
    ///
    /// Useful for headless hosts that do not want to wait for a later frame.
    pub fn wait_until_ready(&mut self) -> Result<(), &WorldError> {
        if let WorldState::Loading(pending) = &self.state {
            let result = pending.wait();
            self.finish_loading(result);
        }

        match &self.state {
            WorldState::Failed(e) => Err(e),
            _ => Ok(()),
        }
    }

    fn finish_loading(&mut self, result: Result<ShapeLibrary, LoadError>) {
        match result
            .context(LoadErr)
            .and_then(|library| self.populate(&library))
        {
            Ok(population) => self.become_ready(population),
            Err(e) => {
                error!("World failed to load: {e}");
                self.state = WorldState::Failed(e);
            }
        }
    }

    fn become_ready(&mut self, population: Population) {
        info!(
            "World ready after {} sub-steps: {} bodies, {} springs",
            self.steps,
            population.bodies.len(),
            population.springs().count()
        );
        self.state = WorldState::Ready(population);
    }

    fn populate(&mut self, library: &ShapeLibrary) -> Result<Population, WorldError> {
        let plan = Plan::new(&self.scene, library, &self.config)?;
        Ok(plan.commit(&mut self.physics, &self.config))
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable access to the scene. Transforms of body nodes are overwritten after
    /// every sub-step.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn physics(&self) -> &PhysicsManager {
        &self.physics
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, WorldState::Ready(_))
    }

    pub fn load_error(&self) -> Option<&WorldError> {
        match &self.state {
            WorldState::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn population(&self) -> Option<&Population> {
        match &self.state {
            WorldState::Ready(population) => Some(population),
            _ => None,
        }
    }

    /// All scene bodies. Empty until the world is ready.
    pub fn bodies(&self) -> &[PhysicsBody] {
        self.population()
            .map(Population::bodies)
            .unwrap_or_default()
    }

    pub fn body_by_name(&self, name: &str) -> Option<&PhysicsBody> {
        self.population()?.body_by_name(name)
    }

    pub fn springs(&self) -> impl Iterator<Item = &Spring> {
        self.population().into_iter().flat_map(Population::springs)
    }

    /// Current simulated pose of a body.
    pub fn body_transform(&self, body: &PhysicsBody) -> Option<Transform> {
        let rb = self.physics.body(body.handle)?;
        Some(Transform::from_parts(*rb.translation(), *rb.rotation()))
    }

    /// Number of fixed sub-steps taken since creation.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Simulated time in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

struct BodyPlan {
    node: NodeId,
    label: String,
    name: Option<String>,
    shape: String,
    mass: f32,
    pose: Isometry3<f32>,
    placements: Vec<ShapePlacement>,
    shapes: Vec<SharedShape>,
}

struct SpringPlan {
    label: String,
    body_a: usize,
    body_b: usize,
    anchor_a: Point3<f32>,
    anchor_b: Point3<f32>,
    rest_length: f32,
    stiffness: f32,
    damping: f32,
}

/// Validated bodies and springs, ready to be inserted without further failure.
struct Plan {
    bodies: Vec<BodyPlan>,
    names: HashMap<String, usize>,
    springs: Vec<SpringPlan>,
}

impl Plan {
    fn new(scene: &Scene, library: &ShapeLibrary, config: &WorldConfig) -> Result<Self, WorldError> {
        let mut plan = Plan {
            bodies: Vec::new(),
            names: HashMap::new(),
            springs: Vec::new(),
        };

        for (id, node) in scene.iter() {
            let Some(desc) = node.body() else {
                continue;
            };

            ensure!(
                desc.mass.is_finite() && desc.mass >= 0.0,
                InvalidMassErr {
                    node: &node.name,
                    mass: desc.mass
                }
            );

            let placements = library
                .get(&desc.shape)
                .context(UnknownShapeErr {
                    node: &node.name,
                    shape: &desc.shape,
                })?
                .clone();

            let shapes = placements
                .iter()
                .map(|placement| {
                    placement.shape.to_shared_shape().context(DegenerateColliderErr {
                        node: &node.name,
                        shape: &desc.shape,
                        kind: placement.shape.kind(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            if let Some(name) = &desc.name {
                ensure!(
                    !plan.names.contains_key(name),
                    DuplicateNameErr { name }
                );
                plan.names.insert(name.clone(), plan.bodies.len());
            }

            plan.bodies.push(BodyPlan {
                node: id,
                label: node.name.clone(),
                name: desc.name.clone(),
                shape: desc.shape.clone(),
                mass: desc.mass,
                pose: node.transform.isometry(),
                placements,
                shapes,
            });
        }

        for (_, node) in scene.iter() {
            let Some(desc) = node.spring() else {
                continue;
            };

            let lookup = |name: &String| {
                plan.names.get(name).copied().context(UnknownBodyErr {
                    spring: &node.name,
                    name,
                })
            };
            let body_a = lookup(&desc.body_a)?;
            let body_b = lookup(&desc.body_b)?;

            let position = Point3::from(node.transform.position());
            plan.springs.push(SpringPlan {
                label: node.name.clone(),
                body_a,
                body_b,
                anchor_a: desc.anchor_a.map_or(position, point3_from_array),
                anchor_b: desc.anchor_b.map_or(position, point3_from_array),
                rest_length: desc.rest_length.unwrap_or(config.spring_rest_length),
                stiffness: desc.stiffness.unwrap_or(config.spring_stiffness),
                damping: desc.damping.unwrap_or(config.spring_damping),
            });
        }

        Ok(plan)
    }

    fn commit(self, physics: &mut PhysicsManager, config: &WorldConfig) -> Population {
        let mut bodies = Vec::with_capacity(self.bodies.len());
        let mut entries = Vec::with_capacity(self.bodies.len() + self.springs.len());

        for (index, plan) in self.bodies.into_iter().enumerate() {
            let dynamic = plan.mass > 0.0;
            let shares = distribute_mass(plan.mass, &plan.shapes);

            let mut builder = if dynamic {
                RigidBodyBuilder::dynamic()
            } else {
                RigidBodyBuilder::fixed()
            }
            .position(plan.pose)
            .user_data(index as u128);

            if dynamic && shares.iter().all(|&share| share == 0.0) {
                builder = builder.additional_mass(plan.mass);
            }

            let colliders = plan
                .placements
                .iter()
                .zip(plan.shapes)
                .zip(shares)
                .map(|((placement, shape), share)| {
                    let collider = ColliderBuilder::new(shape)
                        .position(placement.isometry())
                        .friction(config.friction)
                        .user_data(index as u128);
                    if dynamic && share > 0.0 {
                        collider.mass(share)
                    } else {
                        collider.density(0.0)
                    }
                    .build()
                })
                .collect();

            let handle = physics.insert_body(builder.build(), colliders);
            debug!(
                "Created {} body {:?} from shape {:?} with {} colliders, mass {}",
                if dynamic { "dynamic" } else { "static" },
                plan.label,
                plan.shape,
                plan.placements.len(),
                plan.mass
            );

            entries.push(StepEntry::Sync {
                body: handle,
                node: plan.node,
            });
            bodies.push(PhysicsBody {
                handle,
                node: plan.node,
                name: plan.name,
                shape: plan.shape,
                mass: plan.mass,
                placements: plan.placements,
            });
        }

        for plan in self.springs {
            let Some(spring) = Spring::between(
                &physics.rigid_body_set,
                bodies[plan.body_a].handle,
                bodies[plan.body_b].handle,
                plan.anchor_a,
                plan.anchor_b,
            ) else {
                error!("Spring {:?} lost its bodies during creation", plan.label);
                continue;
            };
            let spring = spring.with_parameters(plan.rest_length, plan.stiffness, plan.damping);
            debug!(
                "Created spring {:?}: rest length {}, stiffness {}, damping {}",
                plan.label, spring.rest_length, spring.stiffness, spring.damping
            );
            entries.push(StepEntry::Spring(spring));
        }

        Population {
            bodies,
            names: self.names,
            entries,
        }
    }
}
