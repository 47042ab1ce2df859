use bon::Builder;
use nalgebra::Vector3;

pub const EARTH_GRAVITY: f32 = 9.81;

/// Tunables for a [`World`](crate::World).
///
/// ```rust
/// use canyon::WorldConfig;
///
/// let config = WorldConfig::builder().max_sub_steps(4).build();
/// assert_eq!(config.max_sub_steps, 4);
/// assert_eq!(config.spring_stiffness, 50.0);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct WorldConfig {
    #[builder(default = Vector3::new(0.0, -EARTH_GRAVITY, 0.0))]
    pub gravity: Vector3<f32>,
    /// Size of one simulation sub-step in seconds.
    #[builder(default = 1.0 / 60.0)]
    pub fixed_time_step: f32,
    /// Longest frame delta that is simulated; anything above is dropped.
    #[builder(default = 1.0 / 10.0)]
    pub max_delta_time: f32,
    #[builder(default = 10)]
    pub max_sub_steps: u32,
    #[builder(default = 0.0)]
    pub spring_rest_length: f32,
    #[builder(default = 50.0)]
    pub spring_stiffness: f32,
    #[builder(default = 0.1)]
    pub spring_damping: f32,
    #[builder(default = 0.3)]
    pub friction: f32,
    /// Adds a static ground plane through the origin, facing +Y.
    #[builder(default = false)]
    pub ground_plane: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig::builder().build()
    }
}
