//! Physics scene runtime.
//!
//! Shapes are imported from a JSON asset into flat lists of collider placements,
//! scene nodes tagged as bodies or springs are wired into a `rapier` simulation, and
//! a frame driver advances it in fixed sub-steps.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod engine;
pub mod utils;
pub mod windowing;

pub use engine::*;
pub use windowing::*;

pub use ::log;
pub use ::nalgebra;
pub use ::rapier3d;
