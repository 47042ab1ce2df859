pub mod assets;
pub mod config;
pub mod core;
pub mod physics;
pub mod world;

pub use self::config::*;
pub use self::world::World;
