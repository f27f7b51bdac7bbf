//! Static collision index
//!
//! Acceleration structure over the immutable level triangles. The object
//! space only depends on the [`StaticIndexBuilder`] / [`StaticIndex`] pair;
//! [`BvhBuilder`] is the implementation used unless another is injected.
//!
//! A built index is read-only. Every query takes `&self` and the index is
//! `Send + Sync`, so any number of threads may query it without locking.

mod bvh;
mod stats;

pub use bvh::{BvhBuilder, TriangleBvh};
pub use stats::{QueryCounters, QueryCounts, QueryKind, StaticIndexStats};

use crate::foundation::math::Vec3;
use crate::geometry::{BoundingSphere, Ray, TriangleRecord, AABB};

/// How many hits a ray query collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RayMode {
    /// Only the closest hit
    #[default]
    Nearest,
    /// Every hit, sorted by distance
    All,
    /// Stop at the first hit found (occlusion tests)
    Any,
}

/// A ray/triangle hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Index of the triangle in the geometry blob
    pub triangle: u32,
    /// Distance from the ray origin
    pub distance: f32,
    /// Barycentric coordinate along the first edge
    pub u: f32,
    /// Barycentric coordinate along the second edge
    pub v: f32,
    /// World-space hit point
    pub point: Vec3,
}

/// Result of a nearest-triangle query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestTriangle {
    /// Index of the triangle in the geometry blob
    pub triangle: u32,
    /// Closest point on that triangle
    pub point: Vec3,
    /// Distance from the query point
    pub distance: f32,
}

/// Read-only queries over static level triangles
///
/// Result buffers are caller-owned; each call clears the buffer before
/// writing so a buffer can be reused across calls without stale entries.
pub trait StaticIndex: Send + Sync {
    /// Cast a ray up to `max_distance`
    fn ray_query(&self, ray: &Ray, max_distance: f32, mode: RayMode, out: &mut Vec<RayHit>);
    
    /// Triangles intersecting a box
    fn box_query(&self, aabb: &AABB, out: &mut Vec<u32>);
    
    /// Triangles touching a sphere
    fn sphere_query(&self, sphere: &BoundingSphere, out: &mut Vec<u32>);
    
    /// Triangles whose bounds contain a point
    fn point_query(&self, point: Vec3, out: &mut Vec<u32>);
    
    /// Closest triangle within `max_distance` of a point
    fn nearest_triangle(&self, point: Vec3, max_distance: f32) -> Option<NearestTriangle>;
    
    /// Number of triangles indexed
    fn triangle_count(&self) -> usize;
    
    /// Snapshot of build and query statistics
    fn statistics(&self) -> StaticIndexStats;
    
    /// Zero the per-frame query counters
    fn reset_frame_statistics(&self);
}

/// Builds a [`StaticIndex`] from level geometry
///
/// Called exactly once per geometry blob. `progress` receives values in
/// `0.0..=1.0` and is always called with `1.0` before returning.
pub trait StaticIndexBuilder: Send + Sync {
    /// Build an index over `triangles`, whose indices refer into `vertices`
    ///
    /// Callers guarantee every index is in range (the geometry blob checks
    /// this on construction).
    fn build(
        &self,
        vertices: &[Vec3],
        triangles: &[TriangleRecord],
        progress: &mut dyn FnMut(f32),
    ) -> Box<dyn StaticIndex>;
}
