use crate::World;
use crate::utils::math::DeltaTimeExt;
use crate::windowing::{Clock, FrameScheduler};
use log::{debug, info, trace};
use std::error::Error;

/// Draws the world after every frame.
#[allow(unused)]
pub trait Renderer {
    fn render(&mut self, world: &World) -> Result<(), Box<dyn Error>>;

    fn destroy(&mut self, world: &World) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

/// Headless hosts render nothing.
impl Renderer for () {
    fn render(&mut self, _world: &World) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

/// What a frame operates on, passed explicitly to every frame.
pub struct AppContext<R: Renderer> {
    pub world: World,
    pub renderer: R,
}

impl<R: Renderer> AppContext<R> {
    pub fn new(world: World, renderer: R) -> Self {
        AppContext { world, renderer }
    }
}

/// Turns clock time into world updates, one frame at a time.
pub struct FrameDriver<C: Clock> {
    clock: C,
    max_delta_time: f32,
    frames: u64,
}

impl<C: Clock> FrameDriver<C> {
    pub fn new(clock: C, max_delta_time: f32) -> Self {
        FrameDriver {
            clock,
            max_delta_time,
            frames: 0,
        }
    }

    /// Uses the world's own delta cap.
    pub fn for_world(clock: C, world: &World) -> Self {
        Self::new(clock, world.config().max_delta_time)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs one frame: advances the world by the clamped clock delta, then renders it.
    /// Returns the number of sub-steps the world took.
    pub fn frame<R: Renderer>(&mut self, ctx: &mut AppContext<R>) -> Result<u32, Box<dyn Error>> {
        let delta = self.clock.delta().clamp_delta(self.max_delta_time);
        let sub_steps = ctx.world.update(delta);
        ctx.renderer.render(&ctx.world)?;

        self.frames += 1;
        trace!(
            "Frame {} advanced {delta:.4}s in {sub_steps} sub-steps",
            self.frames
        );
        Ok(sub_steps)
    }

    /// Runs frames for as long as the scheduler grants them.
    pub fn run<R: Renderer, S: FrameScheduler>(
        &mut self,
        ctx: &mut AppContext<R>,
        mut scheduler: S,
    ) -> Result<(), Box<dyn Error>> {
        info!("Starting frame loop");
        while scheduler.request_animation_frame() {
            self.frame(ctx)?;
        }

        debug!("Frame loop exited after {} frames", self.frames);
        ctx.renderer.destroy(&ctx.world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorldConfig;
    use crate::assets::ShapeLibrary;
    use crate::core::Scene;
    use crate::windowing::ManualClock;

    struct CountingRenderer {
        frames: usize,
        destroyed: bool,
    }

    impl Renderer for CountingRenderer {
        fn render(&mut self, _world: &World) -> Result<(), Box<dyn Error>> {
            self.frames += 1;
            Ok(())
        }

        fn destroy(&mut self, _world: &World) -> Result<(), Box<dyn Error>> {
            self.destroyed = true;
            Ok(())
        }
    }

    fn empty_world() -> World {
        World::with_shapes(Scene::new(), &ShapeLibrary::new(), WorldConfig::default()).unwrap()
    }

    #[test]
    fn frame_clamps_long_deltas() {
        let mut ctx = AppContext::new(empty_world(), ());
        let mut driver = FrameDriver::new(ManualClock::new(), 0.05);

        driver.clock_mut().advance(30.0);
        let sub_steps = driver.frame(&mut ctx).unwrap();

        assert!(sub_steps <= 3);
        assert!(ctx.world.elapsed() <= 0.05 + 1e-6);
    }

    #[test]
    fn run_renders_every_granted_frame() {
        let mut ctx = AppContext::new(
            empty_world(),
            CountingRenderer {
                frames: 0,
                destroyed: false,
            },
        );
        let mut driver = FrameDriver::for_world(ManualClock::new(), &ctx.world);

        let mut granted = 0;
        driver
            .run(&mut ctx, || {
                granted += 1;
                granted <= 4
            })
            .unwrap();

        assert_eq!(ctx.renderer.frames, 4);
        assert_eq!(driver.frames(), 4);
        assert!(ctx.renderer.destroyed);
    }

    #[test]
    fn render_errors_stop_the_loop() {
        struct Broken;
        impl Renderer for Broken {
            fn render(&mut self, _world: &World) -> Result<(), Box<dyn Error>> {
                Err("surface lost".into())
            }
        }

        let mut ctx = AppContext::new(empty_world(), Broken);
        let mut driver = FrameDriver::new(ManualClock::new(), 0.1);
        let err = driver.run(&mut ctx, || true).unwrap_err();

        assert_eq!(err.to_string(), "surface lost");
        assert_eq!(driver.frames(), 0);
    }
}
