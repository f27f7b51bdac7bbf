//! # Object Space
//!
//! Level collision geometry and proximity queries over game objects.
//!
//! ## Features
//!
//! - **Collision Forms**: versioned binary level geometry, read and written
//! - **Static Collision Index**: a BVH over level triangles for ray, box,
//!   sphere, point and nearest-triangle queries
//! - **Dynamic Spatial Indexes**: lock-guarded octrees of object bounding
//!   spheres, one for collideables and one for physics bodies
//! - **Nearest Queries**: "what is within range of this point or object",
//!   safe to call from many threads at once
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use object_space::prelude::*;
//!
//! fn main() -> Result<(), LoadError> {
//!     let config = ObjectSpaceConfig::default().with_level_root("levels/escape");
//!     let mut space = ObjectSpace::from_config(config);
//!     space.load_default()?;
//!
//!     let mut nearby = Vec::new();
//!     space.get_nearest(&mut nearby, Vec3::new(0.0, 1.0, 0.0), 5.0, None);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod config;
pub mod foundation;
pub mod geometry;
pub mod static_index;
pub mod spatial;
pub mod space;
pub mod debug;

#[cfg(test)]
mod tests;

/// Common imports for object space users
pub mod prelude {
    pub use crate::{
        core::config::{ObjectSpaceConfig, StatsConfig},
        config::{Config, ConfigError},
        foundation::math::Vec3,
        geometry::{BoundingSphere, GeometryBlob, LoadError, Ray, TriangleRecord, AABB},
        static_index::{RayHit, RayMode, StaticIndex, StaticIndexBuilder},
        spatial::{ObjectHandle, SharedSpatialIndex, SpatialEntry, SpatialType},
        space::{ObjectSpace, SpaceState},
        debug::{DebugDrawList, PerformanceAlert, StatsFont},
    };
}
