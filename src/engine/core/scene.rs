//! Visual scene nodes and the physics metadata attached to them.
//!
//! A [`Scene`] is the set of nodes a renderer draws. Nodes tagged with
//! [`NodeMetadata`] are picked up by the [`World`](crate::World), which creates
//! bodies and springs for them and writes simulated transforms back every sub-step.

use crate::core::Transform;
use crate::utils::math::{quat_from_array, vec3_from_array};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use snafu::{OptionExt, ResultExt, Snafu};

new_key_type! {
    /// Stable handle to a node in a [`Scene`].
    pub struct NodeId;
}

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)))]
pub enum SceneError {
    #[snafu(display("Scene annotations are not valid JSON: {source}"))]
    ParseAnnotations { source: serde_json::Error },

    #[snafu(display("Annotation {index} has a zero-length quaternion"))]
    AnnotationQuaternion { index: usize },
}

/// Physics metadata carried by a scene node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeMetadata {
    Body(BodyDesc),
    Spring(SpringDesc),
}

/// A rigid body for this node, built from the shape library entry `shape`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDesc {
    pub shape: String,
    /// Zero makes the body static.
    pub mass: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A damped spring between two named bodies.
///
/// Unset parameters fall back to the [`WorldConfig`](crate::WorldConfig) spring
/// defaults. Unset anchors default to the node's own position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpringDesc {
    pub body_a: String,
    pub body_b: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_length: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stiffness: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damping: Option<f32>,
    /// World-space anchor on body A.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_a: Option<[f32; 3]>,
    /// World-space anchor on body B.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_b: Option<[f32; 3]>,
}

impl BodyDesc {
    pub fn new(shape: impl Into<String>, mass: f32) -> Self {
        BodyDesc {
            shape: shape.into(),
            mass,
            name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl SpringDesc {
    pub fn new(body_a: impl Into<String>, body_b: impl Into<String>) -> Self {
        SpringDesc {
            body_a: body_a.into(),
            body_b: body_b.into(),
            rest_length: None,
            stiffness: None,
            damping: None,
            anchor_a: None,
            anchor_b: None,
        }
    }

    pub fn with_anchors(mut self, anchor_a: [f32; 3], anchor_b: [f32; 3]) -> Self {
        self.anchor_a = Some(anchor_a);
        self.anchor_b = Some(anchor_b);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub metadata: Option<NodeMetadata>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        SceneNode {
            name: name.into(),
            transform: Transform::new(),
            metadata: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_metadata(mut self, metadata: NodeMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn body(&self) -> Option<&BodyDesc> {
        match &self.metadata {
            Some(NodeMetadata::Body(body)) => Some(body),
            _ => None,
        }
    }

    pub fn spring(&self) -> Option<&SpringDesc> {
        match &self.metadata {
            Some(NodeMetadata::Spring(spring)) => Some(spring),
            _ => None,
        }
    }
}

/// One record of the annotation exporter output.
#[derive(Debug, Deserialize)]
struct Annotation {
    #[serde(default)]
    position: Option<[f32; 3]>,
    #[serde(default)]
    quaternion: Option<[f32; 4]>,
    #[serde(flatten)]
    metadata: NodeMetadata,
}

/// Flat collection of visual nodes. Iteration follows insertion order.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<NodeId, SceneNode>,
}

impl Scene {
    pub fn new() -> Self {
        Scene::default()
    }

    pub fn add_node(&mut self, node: SceneNode) -> NodeId {
        self.nodes.insert(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter()
    }

    /// Finds a node by its name.
    ///
    /// Note: If multiple nodes have the same name, only the first one found will be returned.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
    }

    /// Builds a scene from annotation exporter output: a JSON array of metadata
    /// records with optional `position` and `quaternion`.
    pub fn from_annotations_json(json: &str) -> Result<Self, SceneError> {
        let annotations: Vec<Annotation> =
            serde_json::from_str(json).context(ParseAnnotationsErr)?;

        let mut scene = Scene::new();
        for (index, annotation) in annotations.into_iter().enumerate() {
            let mut transform = Transform::new();
            if let Some(position) = annotation.position {
                transform.set_position_vec(vec3_from_array(position));
            }
            if let Some(quaternion) = annotation.quaternion {
                let rotation =
                    quat_from_array(quaternion).context(AnnotationQuaternionErr { index })?;
                transform.set_rotation(rotation);
            }

            let name = match &annotation.metadata {
                NodeMetadata::Body(body) => body
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("body.{index}")),
                NodeMetadata::Spring(spring) => {
                    format!("spring.{}.{}", spring.body_a, spring.body_b)
                }
            };

            scene.add_node(
                SceneNode::new(name)
                    .with_transform(transform)
                    .with_metadata(annotation.metadata),
            );
        }

        Ok(scene)
    }
}
