//! Core data structures used throughout the engine.
//!
//! This includes scene nodes, their transforms and the physics metadata they carry.

pub mod scene;
pub mod transform;

pub use scene::*;
pub use transform::*;
