//! Frame pacing for hosts that drive a [`World`](crate::World).
//!
//! A [`FrameDriver`] reads a [`Clock`], advances the world and hands it to a
//! [`Renderer`]. The host decides when frames happen through a [`FrameScheduler`].

pub mod app;
pub mod clock;
pub mod scheduler;

pub use app::*;
pub use clock::*;
pub use scheduler::*;
