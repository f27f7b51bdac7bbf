//! Geometry and object fixtures shared by tests

use crate::core::config::ObjectSpaceConfig;
use crate::foundation::math::Vec3;
use crate::geometry::{BoundingSphere, GeometryBlob, TriangleRecord, AABB};
use crate::space::ObjectSpace;
use crate::spatial::{ObjectHandle, OctreeConfig, SpatialType};

/// Flat grid of `cells` x `cells` quads at `height`, two triangles per quad
pub(crate) fn floor_grid_blob(cells: u32, cell_size: f32, height: f32) -> GeometryBlob {
    stacked_floors_blob(cells, cell_size, &[height])
}

/// One floor grid per entry of `heights`, all covering the same area
#[allow(clippy::cast_precision_loss)]
pub(crate) fn stacked_floors_blob(cells: u32, cell_size: f32, heights: &[f32]) -> GeometryBlob {
    let side = cells + 1;
    let mut vertices = Vec::new();
    let mut triangles = Vec::new();
    
    for (floor, &height) in heights.iter().enumerate() {
        let base = u32::try_from(floor).unwrap() * side * side;
        for j in 0..side {
            for i in 0..side {
                vertices.push(Vec3::new(i as f32 * cell_size, height, j as f32 * cell_size));
            }
        }
        
        for j in 0..cells {
            for i in 0..cells {
                let a = base + j * side + i;
                let b = a + 1;
                let c = a + side + 1;
                let d = a + side;
                triangles.push(TriangleRecord::new([a, b, c]).with_material(1));
                triangles.push(TriangleRecord::new([a, c, d]).with_material(2));
            }
        }
    }
    
    GeometryBlob::with_computed_bounds(vertices, triangles).unwrap()
}

/// Level volume used by scenario tests
pub(crate) fn arena_bounds() -> AABB {
    AABB::new(Vec3::new(-64.0, -16.0, -64.0), Vec3::new(64.0, 48.0, 64.0))
}

/// A 128 x 128 floor centered on the origin inside [`arena_bounds`]
pub(crate) fn arena_blob() -> GeometryBlob {
    let floor = floor_grid_blob(8, 16.0, 0.0);
    let offset = Vec3::new(64.0, 0.0, 64.0);
    let vertices = floor.vertices().iter().map(|v| v - offset).collect();
    GeometryBlob::new(vertices, floor.triangles().to_vec(), arena_bounds()).unwrap()
}

/// Config with small octree nodes so tests exercise subdivision
pub(crate) fn test_config() -> ObjectSpaceConfig {
    ObjectSpaceConfig::default().with_octree(OctreeConfig {
        max_entities_per_node: 2,
        max_depth: 6,
        min_node_size: 1.0,
    })
}

/// Object space in the ready state over [`arena_blob`]
pub(crate) fn ready_space() -> ObjectSpace {
    let mut space = ObjectSpace::from_config(test_config());
    space.create(arena_blob()).unwrap();
    space
}

/// Register a collideable object
pub(crate) fn register(space: &ObjectSpace, handle: ObjectHandle, center: Vec3, radius: f32) {
    space
        .collideable()
        .insert(handle, BoundingSphere::new(center, radius), SpatialType::COLLIDEABLE);
}

/// Sorted copy for order-independent comparisons
pub(crate) fn sorted(handles: &[ObjectHandle]) -> Vec<ObjectHandle> {
    let mut handles = handles.to_vec();
    handles.sort_unstable();
    handles
}
