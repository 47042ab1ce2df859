//! Physics simulation powered by `rapier`.
//!
//! The [`PhysicsManager`] struct owns rigid bodies and colliders and executes one
//! fixed step at a time. [`Spring`]s are applied as external forces between steps.

pub mod collider;
pub mod simulator;
pub mod spring;

pub use collider::*;
pub use simulator::*;
pub use spring::*;
