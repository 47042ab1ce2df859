//! Shape asset import and loading.
//!
//! Shape assets describe collision geometry as JSON trees. They are imported into
//! a [`ShapeLibrary`] of flat collider placements, either directly or in the
//! background through a [`ShapeSource`].
//!
//! Example on how to import shapes directly:
//! ```rust
//! use canyon::assets::{ColliderShape, import_shapes_json};
//!
//! let library = import_shapes_json(r#"{ "crate": { "type": "cube", "extents": [2, 4, 6] } }"#)
//!     .unwrap();
//!
//! let placement = &library["crate"][0];
//! assert!(matches!(placement.shape, ColliderShape::Cuboid { .. }));
//! ```
//!
//! To see how a library is turned into rigid bodies, check [`World`](crate::World)

mod loader;
mod shapes;

pub use self::loader::*;
pub use self::shapes::*;
