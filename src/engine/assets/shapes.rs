//! Shape description import.
//!
//! A shape asset is a JSON object mapping shape keys to [`ShapeNode`] trees. The
//! importer flattens every tree into a list of [`ShapePlacement`]s: one primitive
//! collider each, positioned relative to the body origin. Compound nodes may nest
//! arbitrarily; their children's placements are carried into the parent frame.

use self::ShapeError::*;
use crate::utils::math::{point3_from_array, quat_from_array, tilt_x, tilt_z, vec3_from_array};
use log::trace;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu, ensure};
use std::collections::BTreeMap;

/// Raw shape asset: shape key to root node, in key order.
pub type ShapeDefinitions = BTreeMap<String, ShapeNode>;

/// Resolved shape asset: shape key to flattened collider placements.
pub type ShapeLibrary = BTreeMap<String, Vec<ShapePlacement>>;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)))]
pub enum ShapeError {
    #[snafu(display("Polygon vertex array has {len} floats, which is not a multiple of 3"))]
    VertexArrayLength { len: usize },

    #[snafu(display("Flat polygon index list has {len} entries, which is not a multiple of 3"))]
    IndexArrayLength { len: usize },

    #[snafu(display("Polygon face has {len} indices, at least 3 are needed"))]
    DegenerateFace { len: usize },

    #[snafu(display("Polygon index {index} is out of range for {vertex_count} vertices"))]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[snafu(display("Polygon needs at least 4 vertices, got {vertex_count}"))]
    TooFewVertices { vertex_count: usize },

    #[snafu(display("Shape field `{field}` must be positive, got {value}"))]
    NonPositive { field: &'static str, value: f32 },

    #[snafu(display("Shape field `{field}` must be finite"))]
    NonFinite { field: &'static str },

    #[snafu(display("Cylinder needs at least 3 segments, got {segments}"))]
    TooFewSegments { segments: u32 },

    #[snafu(display("Compound child {index} has a zero-length or non-finite quaternion"))]
    DegenerateQuaternion { index: usize },

    #[snafu(display("Compound child {index}: {source}"))]
    Child {
        index: usize,
        #[snafu(source(from(ShapeError, Box::new)))]
        source: Box<ShapeError>,
    },
}

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)))]
pub enum ImportError {
    #[snafu(display("Shape asset is not valid JSON: {source}"))]
    Parse { source: serde_json::Error },

    #[snafu(display("Shape {key:?} is invalid: {source}"))]
    Shape { key: String, source: ShapeError },
}

/// One node of a shape description tree.
///
/// The set of kinds is closed; an unknown `type` tag is rejected while parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeNode {
    Floor,
    Cube {
        extents: [f32; 3],
    },
    Polygon {
        vertices: Vec<f32>,
        indices: PolygonIndices,
    },
    Sphere {
        radius: f32,
    },
    #[serde(rename_all = "camelCase")]
    Cylinder {
        top_radius: f32,
        bottom_radius: f32,
        height: f32,
        segments: u32,
        axis: CylinderAxis,
    },
    Compound {
        shapes: Vec<CompoundChild>,
    },
}

/// Polygon faces, either as explicit index lists or as the flat triangle list
/// the shape exporter writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolygonIndices {
    Faces(Vec<Vec<u32>>),
    Triangles(Vec<u32>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CylinderAxis {
    X,
    Y,
    Z,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundChild {
    pub shape: ShapeNode,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default = "identity_quaternion")]
    pub quaternion: [f32; 4],
}

fn identity_quaternion() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

/// A resolved primitive collider, independent of the physics engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    /// Infinite plane through the origin with its normal along +Z.
    Plane,
    Cuboid {
        half_extents: Vector3<f32>,
    },
    /// Convex polyhedron given by its vertices and faces. Faces that do not form a
    /// closed convex mesh leave the collider to the hull of the vertices.
    ConvexPolyhedron {
        vertices: Vec<Point3<f32>>,
        faces: Vec<Vec<u32>>,
    },
    Ball {
        radius: f32,
    },
    /// Cylinder or frustum along +Y, centered on the origin.
    Cylinder {
        top_radius: f32,
        bottom_radius: f32,
        height: f32,
        segments: u32,
    },
}

/// A primitive collider placed relative to the body origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePlacement {
    pub shape: ColliderShape,
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl ShapePlacement {
    fn new(shape: ColliderShape, rotation: UnitQuaternion<f32>) -> Self {
        ShapePlacement {
            shape,
            position: Vector3::zeros(),
            rotation,
        }
    }

    fn unrotated(shape: ColliderShape) -> Self {
        Self::new(shape, UnitQuaternion::identity())
    }

    /// Moves this placement from a child frame into its parent frame, where the
    /// child frame sits at `position` with orientation `rotation`.
    pub fn transform(&mut self, position: &Vector3<f32>, rotation: &UnitQuaternion<f32>) {
        self.position = rotation * self.position + position;
        self.rotation = rotation * self.rotation;
    }
}

impl CylinderAxis {
    /// Rotation that lays the engine's +Y cylinder along this axis.
    pub fn rotation(self) -> UnitQuaternion<f32> {
        match self {
            CylinderAxis::X => tilt_z(),
            CylinderAxis::Y => UnitQuaternion::identity(),
            CylinderAxis::Z => tilt_x(),
        }
    }
}

impl PolygonIndices {
    pub fn to_faces(&self) -> Result<Vec<Vec<u32>>, ShapeError> {
        match self {
            PolygonIndices::Faces(faces) => Ok(faces.clone()),
            PolygonIndices::Triangles(flat) => {
                ensure!(flat.len() % 3 == 0, IndexArrayLengthErr { len: flat.len() });
                Ok(flat.chunks_exact(3).map(<[u32]>::to_vec).collect())
            }
        }
    }
}

/// Parses a shape asset and resolves every shape in it.
pub fn import_shapes_json(json: &str) -> Result<ShapeLibrary, ImportError> {
    let definitions: ShapeDefinitions = serde_json::from_str(json).context(ParseErr)?;
    import_shapes(&definitions)
}

/// Resolves every shape tree of an asset into flat placement lists.
pub fn import_shapes(definitions: &ShapeDefinitions) -> Result<ShapeLibrary, ImportError> {
    definitions
        .iter()
        .map(|(key, node)| -> Result<_, ImportError> {
            let placements = resolve(node).context(ShapeErr { key })?;
            trace!("Resolved shape {key:?} into {} placements", placements.len());
            Ok((key.clone(), placements))
        })
        .collect()
}

/// Flattens one shape tree, depth-first with children in declaration order.
pub fn resolve(node: &ShapeNode) -> Result<Vec<ShapePlacement>, ShapeError> {
    let placement = match node {
        ShapeNode::Floor => ShapePlacement::new(ColliderShape::Plane, tilt_x()),
        ShapeNode::Cube { extents } => {
            for value in *extents {
                ensure_positive("extents", value)?;
            }
            ShapePlacement::unrotated(ColliderShape::Cuboid {
                half_extents: vec3_from_array(*extents) / 2.0,
            })
        }
        ShapeNode::Polygon { vertices, indices } => {
            ShapePlacement::unrotated(convex_polyhedron(vertices, indices)?)
        }
        ShapeNode::Sphere { radius } => {
            ensure_positive("radius", *radius)?;
            ShapePlacement::unrotated(ColliderShape::Ball { radius: *radius })
        }
        ShapeNode::Cylinder {
            top_radius,
            bottom_radius,
            height,
            segments,
            axis,
        } => {
            ensure_non_negative("topRadius", *top_radius)?;
            ensure_non_negative("bottomRadius", *bottom_radius)?;
            ensure_positive("topRadius + bottomRadius", top_radius + bottom_radius)?;
            ensure_positive("height", *height)?;
            ensure!(*segments >= 3, TooFewSegmentsErr { segments: *segments });

            let shape = ColliderShape::Cylinder {
                top_radius: *top_radius,
                bottom_radius: *bottom_radius,
                height: *height,
                segments: *segments,
            };
            ShapePlacement::new(shape, axis.rotation())
        }
        ShapeNode::Compound { shapes } => return resolve_compound(shapes),
    };

    Ok(vec![placement])
}

fn resolve_compound(children: &[CompoundChild]) -> Result<Vec<ShapePlacement>, ShapeError> {
    let mut placements = Vec::new();

    for (index, child) in children.iter().enumerate() {
        ensure_finite("position", &child.position).context(ChildErr { index })?;
        let position = vec3_from_array(child.position);
        let rotation =
            quat_from_array(child.quaternion).ok_or(DegenerateQuaternion { index })?;

        let mut resolved = resolve(&child.shape).context(ChildErr { index })?;
        for placement in &mut resolved {
            placement.transform(&position, &rotation);
        }
        placements.append(&mut resolved);
    }

    Ok(placements)
}

fn convex_polyhedron(
    vertices: &[f32],
    indices: &PolygonIndices,
) -> Result<ColliderShape, ShapeError> {
    ensure!(
        vertices.len() % 3 == 0,
        VertexArrayLengthErr { len: vertices.len() }
    );
    ensure_finite("vertices", vertices)?;

    let points: Vec<Point3<f32>> = vertices
        .chunks_exact(3)
        .map(|v| point3_from_array([v[0], v[1], v[2]]))
        .collect();
    ensure!(
        points.len() >= 4,
        TooFewVerticesErr {
            vertex_count: points.len()
        }
    );

    let faces = indices.to_faces()?;
    for face in &faces {
        ensure!(face.len() >= 3, DegenerateFaceErr { len: face.len() });
        if let Some(&index) = face.iter().find(|&&i| i as usize >= points.len()) {
            return IndexOutOfRangeErr {
                index,
                vertex_count: points.len(),
            }
            .fail();
        }
    }

    Ok(ColliderShape::ConvexPolyhedron {
        vertices: points,
        faces,
    })
}

fn ensure_finite(field: &'static str, values: &[f32]) -> Result<(), ShapeError> {
    ensure!(values.iter().all(|v| v.is_finite()), NonFiniteErr { field });
    Ok(())
}

fn ensure_positive(field: &'static str, value: f32) -> Result<(), ShapeError> {
    ensure_finite(field, &[value])?;
    ensure!(value > 0.0, NonPositiveErr { field, value });
    Ok(())
}

fn ensure_non_negative(field: &'static str, value: f32) -> Result<(), ShapeError> {
    ensure_finite(field, &[value])?;
    ensure!(value >= 0.0, NonPositiveErr { field, value });
    Ok(())
}
