use canyon::assets::FileSource;
use canyon::core::Scene;
use canyon::{AppContext, FixedRateScheduler, FrameDriver, Renderer, SystemClock, World, WorldConfig};
use log::{info, warn};
use std::error::Error;

/// Prints where the named bodies are, twice per simulated second.
struct LogRenderer {
    last_report: f64,
}

impl Renderer for LogRenderer {
    fn render(&mut self, world: &World) -> Result<(), Box<dyn Error>> {
        if !world.is_ready() || world.elapsed() - self.last_report < 0.5 {
            return Ok(());
        }
        self.last_report = world.elapsed();

        for body in world.bodies() {
            let (Some(name), Some(transform)) = (&body.name, world.body_transform(body)) else {
                continue;
            };
            let p = transform.position();
            info!("{:>6.2}s {name:<10} ({:7.3}, {:7.3}, {:7.3})", world.elapsed(), p.x, p.y, p.z);
        }
        Ok(())
    }

    fn destroy(&mut self, world: &World) -> Result<(), Box<dyn Error>> {
        if let Some(e) = world.load_error() {
            warn!("World never became ready: {e}");
        }
        info!("Simulated {:.2}s in {} sub-steps", world.elapsed(), world.step_count());
        Ok(())
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("canyon demo failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let root = env!("CARGO_MANIFEST_DIR");
    let scene = Scene::from_annotations_json(&std::fs::read_to_string(format!(
        "{root}/assets/scene.json"
    ))?)?;

    let world = World::new(
        scene,
        FileSource::new(format!("{root}/assets/shapes.json")),
        WorldConfig::default(),
    );

    let mut driver = FrameDriver::for_world(SystemClock::new(), &world);
    let mut ctx = AppContext::new(world, LogRenderer { last_report: 0.0 });

    driver.run(&mut ctx, FixedRateScheduler::default().with_frame_limit(5 * 60))
}
