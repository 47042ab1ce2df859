use crate::assets::{ColliderShape, ShapePlacement};
use crate::utils::math::isometry;
use itertools::Itertools;
use log::trace;
use nalgebra::{Isometry3, Point3, Vector3};
use rapier3d::prelude::*;
use std::collections::HashSet;
use std::f32::consts::TAU;

impl ColliderShape {
    /// Builds the rapier shape. `None` if a convex hull cannot be formed.
    pub fn to_shared_shape(&self) -> Option<SharedShape> {
        let shape = match self {
            ColliderShape::Plane => SharedShape::halfspace(Vector3::z_axis()),
            ColliderShape::Cuboid { half_extents } => {
                SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            ColliderShape::ConvexPolyhedron { vertices, faces } => polyhedron(vertices, faces)?,
            ColliderShape::Ball { radius } => SharedShape::ball(*radius),
            ColliderShape::Cylinder {
                top_radius,
                bottom_radius,
                height,
                ..
            } if top_radius == bottom_radius => SharedShape::cylinder(height / 2.0, *top_radius),
            ColliderShape::Cylinder {
                top_radius,
                bottom_radius,
                height,
                segments,
            } => SharedShape::convex_hull(&frustum_points(
                *top_radius,
                *bottom_radius,
                *height,
                *segments,
            ))?,
        };

        trace!("[Collider] Type: {:?}", shape.shape_type());
        Some(shape)
    }

    /// Short kind name for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            ColliderShape::Plane => "plane",
            ColliderShape::Cuboid { .. } => "cuboid",
            ColliderShape::ConvexPolyhedron { .. } => "convex polyhedron",
            ColliderShape::Ball { .. } => "ball",
            ColliderShape::Cylinder { .. } => "cylinder",
        }
    }
}

impl ShapePlacement {
    /// Placement relative to the body origin.
    pub fn isometry(&self) -> Isometry3<f32> {
        isometry(self.position, self.rotation)
    }
}

/// Builds a polyhedron from its faces when they form a closed, outward-wound convex
/// mesh. Anything else falls back to the hull of the vertices.
fn polyhedron(vertices: &[Point3<f32>], faces: &[Vec<u32>]) -> Option<SharedShape> {
    let triangles = fan_triangles(faces);
    if is_closed_convex_mesh(vertices, &triangles) {
        if let Some(shape) = SharedShape::convex_mesh(vertices.to_vec(), &triangles) {
            return Some(shape);
        }
    }

    trace!("[Collider] Polygon faces are not a closed convex mesh, using the vertex hull");
    SharedShape::convex_hull(vertices)
}

/// Splits every face into a triangle fan around its first index.
fn fan_triangles(faces: &[Vec<u32>]) -> Vec<[u32; 3]> {
    faces
        .iter()
        .flat_map(|face| {
            (1..face.len().saturating_sub(1)).map(move |i| [face[0], face[i], face[i + 1]])
        })
        .collect()
}

/// Every directed edge has exactly one opposite, every vertex is used, and no vertex
/// lies in front of any triangle.
fn is_closed_convex_mesh(vertices: &[Point3<f32>], triangles: &[[u32; 3]]) -> bool {
    if vertices.len() < 4 || triangles.len() < 4 {
        return false;
    }

    let mut edges = HashSet::new();
    for &[a, b, c] in triangles {
        for edge in [(a, b), (b, c), (c, a)] {
            if edge.0 == edge.1 || !edges.insert(edge) {
                return false;
            }
        }
    }
    if !edges.iter().all(|&(a, b)| edges.contains(&(b, a))) {
        return false;
    }

    let used: HashSet<u32> = edges.iter().map(|&(a, _)| a).collect();
    if used.len() != vertices.len() {
        return false;
    }

    let extent = vertices
        .iter()
        .flat_map(|v| v.coords.iter().map(|c| c.abs()))
        .fold(1.0f32, f32::max);
    let tolerance = 1e-4 * extent;

    triangles.iter().all(|triangle| {
        let [Some(a), Some(b), Some(c)] = triangle.map(|i| vertices.get(i as usize)) else {
            return false;
        };
        let Some(normal) = (b - a).cross(&(c - a)).try_normalize(f32::EPSILON) else {
            return false;
        };
        vertices.iter().all(|v| normal.dot(&(v - a)) <= tolerance)
    })
}

/// Points of a `segments`-sided frustum along +Y. A zero radius collapses its
/// ring into a single apex.
fn frustum_points(top_radius: f32, bottom_radius: f32, height: f32, segments: u32) -> Vec<Point3<f32>> {
    let half_height = height / 2.0;
    let ring = |radius: f32, y: f32| -> Vec<Point3<f32>> {
        if radius == 0.0 {
            return vec![Point3::new(0.0, y, 0.0)];
        }
        (0..segments)
            .map(|i| {
                let angle = TAU * i as f32 / segments as f32;
                Point3::new(radius * angle.cos(), y, radius * angle.sin())
            })
            .collect()
    };

    ring(top_radius, half_height)
        .into_iter()
        .chain(ring(bottom_radius, -half_height))
        .collect_vec()
}

/// Splits `total` mass across shapes in proportion to their volume.
///
/// Shapes without volume (planes) get nothing. If no shape has volume, every share is zero.
pub fn distribute_mass(total: f32, shapes: &[SharedShape]) -> Vec<f32> {
    let volumes = shapes
        .iter()
        .map(|shape| shape.mass_properties(1.0).mass())
        .collect_vec();
    let volume: f32 = volumes.iter().sum();

    if !(volume > 0.0) {
        return vec![0.0; shapes.len()];
    }

    volumes.iter().map(|v| total * v / volume).collect()
}
