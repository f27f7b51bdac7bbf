//! Dynamic spatial indexes
//!
//! Mutable indexes of game-object bounding spheres used for proximity
//! queries. The object space holds two: one for collideable objects and one
//! for physics bodies.

mod handle;
mod octree;
mod shared;
mod spatial_query;

pub use handle::{ObjectHandle, SpatialType};
pub use octree::{Octree, OctreeConfig, OctreeNode};
pub use shared::SharedSpatialIndex;
pub use spatial_query::{OctreeSpatialIndex, SpatialEntry, SpatialIndex};
