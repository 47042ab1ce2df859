use canyon::assets::{ColliderShape, FileSource, InlineSource, LoadError, ShapeSource, import_shapes_json};
use canyon::core::{BodyDesc, NodeMetadata, Scene, SceneNode, SpringDesc, Transform};
use canyon::world::{WorldError, WorldState};
use canyon::{World, WorldConfig};
use crossbeam_channel::{Receiver, bounded};
use futures::future::BoxFuture;
use nalgebra::{Point3, UnitQuaternion, Vector3};

const BALL: &str = r#"{"ball":{"type":"sphere","radius":1}}"#;

fn at(x: f32, y: f32, z: f32) -> Transform {
    Transform::from_parts(Vector3::new(x, y, z), UnitQuaternion::identity())
}

fn body(name: &str, mass: f32, transform: Transform) -> SceneNode {
    SceneNode::new(name)
        .with_transform(transform)
        .with_metadata(NodeMetadata::Body(BodyDesc::new("ball", mass).named(name)))
}

fn single_ball_scene() -> Scene {
    let mut scene = Scene::new();
    scene.add_node(body("A", 5.0, at(0.0, 10.0, 0.0)));
    scene
}

/// Holds the shape JSON back until the test releases it.
struct GatedSource {
    gate: Receiver<()>,
}

impl ShapeSource for GatedSource {
    fn name(&self) -> String {
        "gated".to_string()
    }

    fn fetch(&self) -> BoxFuture<'_, Result<String, LoadError>> {
        Box::pin(async move {
            let _ = self.gate.recv();
            Ok::<_, LoadError>(BALL.to_string())
        })
    }
}

#[test]
fn single_ball_falls() {
    let _ = env_logger::builder().is_test(true).try_init();

    let library = import_shapes_json(BALL).unwrap();
    let mut world = World::with_shapes(single_ball_scene(), &library, WorldConfig::default()).unwrap();

    assert!(world.is_ready());
    assert_eq!(world.bodies().len(), 1);

    let a = world.body_by_name("A").unwrap().clone();
    assert_eq!(a.mass, 5.0);
    assert_eq!(a.placements.len(), 1);
    assert_eq!(a.placements[0].shape, ColliderShape::Ball { radius: 1.0 });
    assert_eq!(a.placements[0].position, Vector3::zeros());

    let rb = world.physics().body(a.handle).unwrap();
    assert!((rb.mass() - 5.0).abs() < 1e-3);

    assert_eq!(world.update(1.0 / 60.0), 1);

    let node = world.scene().get(a.node).unwrap();
    let dropped = 10.0 - node.transform.position().y;
    // One 1/60 s step under g moves the ball by a couple of millimetres.
    assert!(dropped > 0.001 && dropped < 0.003, "dropped {dropped}");
    assert_eq!(
        node.transform.position(),
        world.body_transform(&a).unwrap().position()
    );
}

#[test]
fn gravity_displacement_after_one_second() {
    let library = import_shapes_json(BALL).unwrap();
    let mut world = World::with_shapes(single_ball_scene(), &library, WorldConfig::default()).unwrap();

    for _ in 0..60 {
        world.update(1.0 / 60.0);
    }

    let a = world.body_by_name("A").unwrap();
    let dropped = 10.0 - world.body_transform(a).unwrap().position().y;
    // Free fall for one second covers g/2, give or take the integrator.
    assert!(dropped > 4.5 && dropped < 5.2, "dropped {dropped}");
    assert_eq!(world.step_count(), 60);
    assert!((world.elapsed() - 1.0).abs() < 1e-4);
}

#[test]
fn spring_pulls_bodies_together() {
    let library = import_shapes_json(BALL).unwrap();
    let mut scene = Scene::new();
    scene.add_node(body("A", 5.0, at(0.0, 0.0, 0.0)));
    scene.add_node(body("B", 5.0, at(4.0, 0.0, 0.0)));
    scene.add_node(SceneNode::new("link").with_metadata(NodeMetadata::Spring(
        SpringDesc::new("A", "B").with_anchors([0.0, 0.0, 0.0], [4.0, 0.0, 0.0]),
    )));

    let config = WorldConfig::builder().gravity(Vector3::zeros()).build();
    let mut world = World::with_shapes(scene, &library, config).unwrap();

    let spring = world.springs().next().unwrap().clone();
    assert_eq!(spring.stiffness, 50.0);
    assert_eq!(spring.damping, 0.1);
    assert_eq!(spring.rest_length, 0.0);

    for _ in 0..5 {
        world.update(1.0 / 60.0);
    }

    let x = |name| {
        let body = world.body_by_name(name).unwrap();
        world.body_transform(body).unwrap().position().x
    };
    let (a, b) = (x("A"), x("B"));
    assert!(a > 0.0, "A should move toward B, x = {a}");
    assert!(b < 4.0, "B should move toward A, x = {b}");
    assert!((a - (4.0 - b)).abs() < 1e-3, "equal masses move symmetrically");
}

#[test]
fn spring_anchors_default_to_the_spring_node() {
    let library = import_shapes_json(BALL).unwrap();
    let mut scene = Scene::new();
    scene.add_node(body("A", 5.0, at(0.0, 0.0, 0.0)));
    scene.add_node(body("B", 5.0, at(4.0, 0.0, 0.0)));
    scene.add_node(
        SceneNode::new("link")
            .with_transform(at(2.0, 0.0, 0.0))
            .with_metadata(NodeMetadata::Spring(SpringDesc::new("A", "B"))),
    );

    let world = World::with_shapes(scene, &library, WorldConfig::default()).unwrap();
    let spring = world.springs().next().unwrap();

    assert_eq!(spring.local_anchor_a, Point3::new(2.0, 0.0, 0.0));
    assert_eq!(spring.local_anchor_b, Point3::new(-2.0, 0.0, 0.0));

    // Both ends start at the same point, so the spring is at rest.
    let length = spring.length(&world.physics().rigid_body_set).unwrap();
    assert!(length.abs() < 1e-6);
}

#[test]
fn spring_to_unknown_body_fails() {
    let library = import_shapes_json(BALL).unwrap();
    let mut scene = single_ball_scene();
    scene.add_node(
        SceneNode::new("dangling").with_metadata(NodeMetadata::Spring(SpringDesc::new("A", "Nope"))),
    );

    let err = World::with_shapes(scene, &library, WorldConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, WorldError::UnknownBody { ref name, .. } if name == "Nope"));
}

#[test]
fn updates_before_ready_run_without_bodies() {
    let (release, gate) = bounded(1);
    let mut world = World::new(single_ball_scene(), GatedSource { gate }, WorldConfig::default());

    for _ in 0..5 {
        world.update(1.0 / 60.0);
    }
    assert!(matches!(world.state(), WorldState::Loading(_)));
    assert!(world.bodies().is_empty());
    assert_eq!(world.step_count(), 5);

    release.send(()).unwrap();
    world.wait_until_ready().unwrap();

    assert!(world.is_ready());
    let a = world.body_by_name("A").unwrap();
    // Created at the node's declared pose, not where a late body would have fallen to.
    assert_eq!(world.body_transform(a).unwrap().position().y, 10.0);
}

#[test]
fn ready_transition_happens_during_update() {
    let mut world = World::new(
        single_ball_scene(),
        InlineSource::new("inline", BALL),
        WorldConfig::default(),
    );
    assert!(!world.is_ready());

    let mut frames = 0;
    while !world.is_ready() && frames < 10_000 {
        world.update(1.0 / 60.0);
        frames += 1;
        std::thread::yield_now();
    }

    assert!(world.is_ready(), "load never finished");
    assert_eq!(world.bodies().len(), 1);
}

#[test]
fn failed_load_is_kept_and_simulation_continues() {
    let mut world = World::new(
        single_ball_scene(),
        InlineSource::new("broken", r#"{"ball":{"type":"torus"}}"#),
        WorldConfig::default(),
    );

    assert!(world.wait_until_ready().is_err());
    assert!(matches!(world.load_error(), Some(WorldError::Load { .. })));

    world.update(1.0 / 60.0);
    assert_eq!(world.step_count(), 1);
    assert!(world.bodies().is_empty());
}

#[test]
fn large_deltas_are_capped() {
    let library = import_shapes_json(BALL).unwrap();
    let mut capped = World::with_shapes(single_ball_scene(), &library, WorldConfig::default()).unwrap();
    let mut reference = World::with_shapes(single_ball_scene(), &library, WorldConfig::default()).unwrap();

    assert_eq!(capped.update(60.0), reference.update(0.1));
    assert!(capped.step_count() <= 6);
    assert_eq!(capped.update(f32::NAN), 0);
    assert_eq!(capped.update(-1.0), 0);
}

#[test]
fn sub_step_budget_drops_leftover_time() {
    let library = import_shapes_json(BALL).unwrap();
    let config = WorldConfig::builder()
        .max_delta_time(1.0)
        .max_sub_steps(3)
        .build();
    let mut world = World::with_shapes(single_ball_scene(), &library, config).unwrap();

    assert_eq!(world.update(1.0), 3);
    // The remaining 57 steps worth of time are gone, not carried over.
    assert_eq!(world.update(0.0), 0);
    assert_eq!(world.step_count(), 3);
}

#[test]
fn shipped_assets_load() {
    let root = env!("CARGO_MANIFEST_DIR");
    let scene =
        Scene::from_annotations_json(&std::fs::read_to_string(format!("{root}/assets/scene.json")).unwrap())
            .unwrap();
    let mut world = World::new(
        scene,
        FileSource::new(format!("{root}/assets/shapes.json")),
        WorldConfig::default(),
    );

    world.wait_until_ready().unwrap();
    assert_eq!(world.bodies().len(), 10);
    assert_eq!(world.springs().count(), 4);
    assert_eq!(world.body_by_name("cart").unwrap().placements.len(), 5);
    assert!(world.scene().find_by_name("spring.chassis.wheel.fl").is_some());

    for _ in 0..120 {
        world.update(1.0 / 60.0);
    }

    let y = |name| {
        let body = world.body_by_name(name).unwrap();
        world.body_transform(body).unwrap().position().y
    };
    assert!(y("ball") < 6.0);
    assert!(y("chassis") > 0.5, "chassis sank through its wheels");
    assert_eq!(y("ground"), 0.0);
}
