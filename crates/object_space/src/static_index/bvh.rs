//! Bounding volume hierarchy over level triangles
//!
//! Built top-down by splitting at the median centroid on the widest axis.
//! Nodes live in one flat array, children are addressed by index, and each
//! leaf owns a contiguous run of the reordered triangle array.

use std::cell::Cell;

use log::debug;

use crate::foundation::math::{utils, Vec3};
use crate::foundation::time::Stopwatch;
use crate::geometry::{BoundingSphere, Ray, Triangle, TriangleRecord, AABB};
use super::stats::{QueryCounters, QueryKind, StaticIndexStats};
use super::{NearestTriangle, RayHit, RayMode, StaticIndex, StaticIndexBuilder};

/// Builder for [`TriangleBvh`]
#[derive(Debug, Clone)]
pub struct BvhBuilder {
    /// Maximum triangles stored in one leaf
    pub max_leaf_size: usize,
}

impl Default for BvhBuilder {
    fn default() -> Self {
        Self { max_leaf_size: 4 }
    }
}

impl BvhBuilder {
    /// Builder with the default leaf size
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Set the maximum leaf size (at least one)
    pub fn with_max_leaf_size(mut self, size: usize) -> Self {
        self.max_leaf_size = size.max(1);
        self
    }
    
    /// Build the concrete hierarchy
    #[allow(clippy::cast_possible_truncation)] // collision forms address triangles with u32
    pub fn build_bvh(
        &self,
        vertices: &[Vec3],
        triangles: &[TriangleRecord],
        progress: &mut dyn FnMut(f32),
    ) -> TriangleBvh {
        let stopwatch = Stopwatch::start_new();
        
        let items: Vec<BuildItem> = triangles
            .iter()
            .enumerate()
            .map(|(id, record)| {
                let [a, b, c] = record.verts;
                let triangle = Triangle::new(vertices[a as usize], vertices[b as usize], vertices[c as usize]);
                BuildItem {
                    id: id as u32,
                    bounds: triangle.bounds(),
                    centroid: triangle.centroid(),
                    triangle,
                }
            })
            .collect();
        
        let mut state = BuildState {
            items,
            nodes: Vec::new(),
            max_leaf_size: self.max_leaf_size.max(1),
            max_depth: 0,
            leaf_count: 0,
            placed: 0,
            last_reported: 0.0,
            progress,
        };
        
        if state.items.is_empty() {
            (state.progress)(1.0);
        } else {
            state.build_node(0, state.items.len(), 0);
        }
        
        let BuildState { items, nodes, max_depth, leaf_count, .. } = state;
        let ids = items.iter().map(|item| item.id).collect();
        let triangles = items.iter().map(|item| item.triangle).collect();
        
        let bvh = TriangleBvh {
            nodes,
            triangles,
            ids,
            max_depth,
            leaf_count,
            build_time: stopwatch.elapsed(),
            counters: QueryCounters::default(),
        };
        
        debug!(
            "Built triangle BVH: {} triangles, {} nodes, depth {} in {:.2} ms",
            bvh.triangles.len(),
            bvh.nodes.len(),
            bvh.max_depth,
            stopwatch.elapsed_millis()
        );
        
        bvh
    }
}

impl StaticIndexBuilder for BvhBuilder {
    fn build(
        &self,
        vertices: &[Vec3],
        triangles: &[TriangleRecord],
        progress: &mut dyn FnMut(f32),
    ) -> Box<dyn StaticIndex> {
        Box::new(self.build_bvh(vertices, triangles, progress))
    }
}

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Leaf { first: u32, count: u32 },
    Inner { left: u32, right: u32 },
}

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    bounds: AABB,
    kind: NodeKind,
}

struct BuildItem {
    id: u32,
    triangle: Triangle,
    bounds: AABB,
    centroid: Vec3,
}

struct BuildState<'a> {
    items: Vec<BuildItem>,
    nodes: Vec<BvhNode>,
    max_leaf_size: usize,
    max_depth: u32,
    leaf_count: usize,
    placed: usize,
    last_reported: f32,
    progress: &'a mut dyn FnMut(f32),
}

impl BuildState<'_> {
    #[allow(clippy::cast_possible_truncation)]
    fn build_node(&mut self, start: usize, end: usize, depth: u32) -> u32 {
        let mut bounds = AABB::invalid();
        let mut centroid_bounds = AABB::invalid();
        for item in &self.items[start..end] {
            bounds.merge(&item.bounds);
            centroid_bounds.merge_point(&item.centroid);
        }
        
        let count = end - start;
        let node_index = self.nodes.len() as u32;
        self.nodes.push(BvhNode {
            bounds,
            kind: NodeKind::Leaf { first: start as u32, count: count as u32 },
        });
        self.max_depth = self.max_depth.max(depth);
        
        if count <= self.max_leaf_size {
            self.leaf_count += 1;
            self.placed += count;
            self.report_progress();
            return node_index;
        }
        
        // Ranges of finished siblings are never touched again, so leaves can
        // refer to slices of the reordered item array.
        let axis = utils::largest_axis(&centroid_bounds.size());
        let half = count / 2;
        self.items[start..end].select_nth_unstable_by(half, |a, b| {
            a.centroid[axis].total_cmp(&b.centroid[axis])
        });
        
        let left = self.build_node(start, start + half, depth + 1);
        let right = self.build_node(start + half, end, depth + 1);
        self.nodes[node_index as usize].kind = NodeKind::Inner { left, right };
        node_index
    }
    
    #[allow(clippy::cast_precision_loss)]
    fn report_progress(&mut self) {
        let total = self.items.len();
        let fraction = self.placed as f32 / total as f32;
        if self.placed == total || fraction - self.last_reported >= 0.01 {
            self.last_reported = fraction;
            (self.progress)(fraction);
        }
    }
}

/// Read-only triangle hierarchy produced by [`BvhBuilder`]
pub struct TriangleBvh {
    nodes: Vec<BvhNode>,
    triangles: Vec<Triangle>,
    ids: Vec<u32>,
    max_depth: u32,
    leaf_count: usize,
    build_time: std::time::Duration,
    counters: QueryCounters,
}

impl TriangleBvh {
    /// Bounds of all indexed triangles
    pub fn bounds(&self) -> Option<AABB> {
        self.nodes.first().map(|root| root.bounds)
    }
    
    /// Depth-first walk. `enter` decides whether a node's subtree is visited;
    /// `visit` is called for each triangle slot in visited leaves and stops
    /// the walk by returning `false`.
    fn traverse(&self, enter: impl Fn(&AABB) -> bool, mut visit: impl FnMut(usize) -> bool) {
        if self.nodes.is_empty() {
            return;
        }
        
        let mut stack: Vec<u32> = Vec::with_capacity(64);
        stack.push(0);
        
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if !enter(&node.bounds) {
                continue;
            }
            
            match node.kind {
                NodeKind::Leaf { first, count } => {
                    for slot in first as usize..(first + count) as usize {
                        if !visit(slot) {
                            return;
                        }
                    }
                }
                NodeKind::Inner { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
    }
}

impl StaticIndex for TriangleBvh {
    fn ray_query(&self, ray: &Ray, max_distance: f32, mode: RayMode, out: &mut Vec<RayHit>) {
        out.clear();
        self.counters.record(QueryKind::Ray);
        
        let limit = Cell::new(max_distance);
        self.traverse(
            |bounds| {
                bounds
                    .intersect_ray(ray.origin, ray.direction)
                    .is_some_and(|t| t <= limit.get())
            },
            |slot| {
                let Some((t, u, v)) = self.triangles[slot].intersect_ray(ray) else {
                    return true;
                };
                if t > limit.get() {
                    return true;
                }
                
                let hit = RayHit {
                    triangle: self.ids[slot],
                    distance: t,
                    u,
                    v,
                    point: ray.point_at(t),
                };
                
                match mode {
                    RayMode::Nearest => {
                        if out.first().map_or(true, |best| t < best.distance) {
                            limit.set(t);
                            out.clear();
                            out.push(hit);
                        }
                        true
                    }
                    RayMode::All => {
                        out.push(hit);
                        true
                    }
                    RayMode::Any => {
                        out.push(hit);
                        false
                    }
                }
            },
        );
        
        if mode == RayMode::All {
            out.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.triangle.cmp(&b.triangle)));
        }
    }
    
    fn box_query(&self, aabb: &AABB, out: &mut Vec<u32>) {
        out.clear();
        self.counters.record(QueryKind::Box);
        
        self.traverse(
            |bounds| bounds.intersects(aabb),
            |slot| {
                if self.triangles[slot].intersects_aabb(aabb) {
                    out.push(self.ids[slot]);
                }
                true
            },
        );
    }
    
    fn sphere_query(&self, sphere: &BoundingSphere, out: &mut Vec<u32>) {
        out.clear();
        self.counters.record(QueryKind::Sphere);
        
        let radius_sq = sphere.radius * sphere.radius;
        self.traverse(
            |bounds| bounds.distance_squared_to_point(sphere.center) <= radius_sq,
            |slot| {
                if self.triangles[slot].intersects_sphere(sphere) {
                    out.push(self.ids[slot]);
                }
                true
            },
        );
    }
    
    fn point_query(&self, point: Vec3, out: &mut Vec<u32>) {
        out.clear();
        self.counters.record(QueryKind::Point);
        
        self.traverse(
            |bounds| bounds.contains_point(point),
            |slot| {
                if self.triangles[slot].bounds().contains_point(point) {
                    out.push(self.ids[slot]);
                }
                true
            },
        );
    }
    
    fn nearest_triangle(&self, point: Vec3, max_distance: f32) -> Option<NearestTriangle> {
        self.counters.record(QueryKind::Nearest);
        
        let limit_sq = Cell::new(max_distance * max_distance);
        let best: Cell<Option<NearestTriangle>> = Cell::new(None);
        
        self.traverse(
            |bounds| bounds.distance_squared_to_point(point) <= limit_sq.get(),
            |slot| {
                let closest = self.triangles[slot].closest_point(point);
                let distance_sq = (closest - point).magnitude_squared();
                let improves = best.get().map_or(distance_sq <= limit_sq.get(), |_| distance_sq < limit_sq.get());
                if improves {
                    limit_sq.set(distance_sq);
                    best.set(Some(NearestTriangle {
                        triangle: self.ids[slot],
                        point: closest,
                        distance: distance_sq.sqrt(),
                    }));
                }
                true
            },
        );
        
        best.get()
    }
    
    fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
    
    fn statistics(&self) -> StaticIndexStats {
        StaticIndexStats {
            triangle_count: self.triangles.len(),
            node_count: self.nodes.len(),
            leaf_count: self.leaf_count,
            max_depth: self.max_depth,
            build_time: self.build_time,
            memory_bytes: self.nodes.len() * std::mem::size_of::<BvhNode>()
                + self.triangles.len() * std::mem::size_of::<Triangle>()
                + self.ids.len() * std::mem::size_of::<u32>(),
            frame_queries: self.counters.frame(),
            total_queries: self.counters.total(),
        }
    }
    
    fn reset_frame_statistics(&self) {
        self.counters.reset_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryBlob;
    use crate::tests::support::{floor_grid_blob, stacked_floors_blob};
    use approx::assert_relative_eq;
    
    fn build(blob: &GeometryBlob) -> TriangleBvh {
        BvhBuilder::new().build_bvh(blob.vertices(), blob.triangles(), &mut |_| {})
    }
    
    fn sorted(mut ids: Vec<u32>) -> Vec<u32> {
        ids.sort_unstable();
        ids
    }
    
    #[test]
    fn test_build_shape_and_progress() {
        let blob = floor_grid_blob(8, 1.0, 0.0);
        let mut reports = Vec::new();
        let bvh = BvhBuilder::new().build_bvh(blob.vertices(), blob.triangles(), &mut |p| reports.push(p));
        
        let stats = bvh.statistics();
        assert_eq!(stats.triangle_count, 128);
        assert_eq!(stats.node_count, 2 * stats.leaf_count - 1);
        assert!(stats.max_depth >= 5);
        
        assert!(!reports.is_empty());
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(reports.last().copied(), Some(1.0));
    }
    
    #[test]
    fn test_empty_geometry() {
        let mut reports = Vec::new();
        let bvh = BvhBuilder::new().build_bvh(&[], &[], &mut |p| reports.push(p));
        assert_eq!(reports, vec![1.0]);
        assert_eq!(bvh.triangle_count(), 0);
        assert!(bvh.bounds().is_none());
        
        let mut hits = Vec::new();
        bvh.ray_query(&Ray::new(Vec3::zeros(), Vec3::y()), 100.0, RayMode::All, &mut hits);
        assert!(hits.is_empty());
        assert!(bvh.nearest_triangle(Vec3::zeros(), 100.0).is_none());
    }
    
    #[test]
    fn test_ray_modes() {
        let blob = stacked_floors_blob(4, 2.0, &[0.0, 5.0, 10.0]);
        let bvh = build(&blob);
        let ray = Ray::new(Vec3::new(3.1, 20.0, 2.7), Vec3::new(0.0, -1.0, 0.0));
        let mut hits = Vec::new();
        
        bvh.ray_query(&ray, 100.0, RayMode::Nearest, &mut hits);
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].distance, 10.0, epsilon = 1e-4);
        assert_relative_eq!(hits[0].point.y, 10.0, epsilon = 1e-4);
        
        bvh.ray_query(&ray, 100.0, RayMode::All, &mut hits);
        let distances: Vec<f32> = hits.iter().map(|hit| hit.distance).collect();
        assert_eq!(distances.len(), 3);
        assert_relative_eq!(distances[0], 10.0, epsilon = 1e-4);
        assert_relative_eq!(distances[1], 15.0, epsilon = 1e-4);
        assert_relative_eq!(distances[2], 20.0, epsilon = 1e-4);
        
        bvh.ray_query(&ray, 100.0, RayMode::Any, &mut hits);
        assert_eq!(hits.len(), 1);
        
        bvh.ray_query(&ray, 12.0, RayMode::All, &mut hits);
        assert_eq!(hits.len(), 1);
        
        bvh.ray_query(&ray, 5.0, RayMode::Nearest, &mut hits);
        assert!(hits.is_empty());
    }
    
    #[test]
    fn test_volume_queries_match_brute_force() {
        let blob = stacked_floors_blob(6, 1.5, &[0.0, 3.0]);
        let bvh = build(&blob);
        let mut ids = Vec::new();
        
        let boxes = [
            AABB::new(Vec3::new(1.0, -0.5, 1.0), Vec3::new(3.0, 0.5, 2.0)),
            AABB::new(Vec3::new(-5.0, -1.0, -5.0), Vec3::new(20.0, 4.0, 20.0)),
            AABB::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(3.0, 2.0, 3.0)),
        ];
        for aabb in boxes {
            bvh.box_query(&aabb, &mut ids);
            let expected: Vec<u32> = (0u32..)
                .zip(blob.iter_triangles())
                .filter(|(_, tri)| tri.intersects_aabb(&aabb))
                .map(|(id, _)| id)
                .collect();
            assert_eq!(sorted(ids.clone()), expected);
        }
        
        let spheres = [
            BoundingSphere::new(Vec3::new(4.0, 1.0, 4.0), 1.2),
            BoundingSphere::new(Vec3::new(4.0, 1.5, 4.0), 1.4),
            BoundingSphere::new(Vec3::new(100.0, 0.0, 0.0), 3.0),
        ];
        for sphere in spheres {
            bvh.sphere_query(&sphere, &mut ids);
            let expected: Vec<u32> = (0u32..)
                .zip(blob.iter_triangles())
                .filter(|(_, tri)| tri.intersects_sphere(&sphere))
                .map(|(id, _)| id)
                .collect();
            assert_eq!(sorted(ids.clone()), expected);
        }
    }
    
    #[test]
    fn test_point_query_uses_triangle_bounds() {
        let blob = floor_grid_blob(2, 1.0, 0.0);
        let bvh = build(&blob);
        let mut ids = Vec::new();
        
        bvh.point_query(Vec3::new(0.25, 0.0, 0.75), &mut ids);
        let expected: Vec<u32> = (0u32..)
            .zip(blob.iter_triangles())
            .filter(|(_, tri)| tri.bounds().contains_point(Vec3::new(0.25, 0.0, 0.75)))
            .map(|(id, _)| id)
            .collect();
        assert!(!expected.is_empty());
        assert_eq!(sorted(ids.clone()), expected);
        
        bvh.point_query(Vec3::new(0.25, 1.0, 0.75), &mut ids);
        assert!(ids.is_empty());
    }
    
    #[test]
    fn test_nearest_triangle() {
        let blob = stacked_floors_blob(4, 1.0, &[0.0, 6.0]);
        let bvh = build(&blob);
        
        let nearest = bvh.nearest_triangle(Vec3::new(1.5, 2.0, 1.5), 10.0).unwrap();
        assert_relative_eq!(nearest.distance, 2.0, epsilon = 1e-4);
        assert_relative_eq!(nearest.point, Vec3::new(1.5, 0.0, 1.5), epsilon = 1e-4);
        let triangle = blob.triangle(nearest.triangle as usize).unwrap();
        assert_relative_eq!(triangle.v0.y, 0.0);
        
        let nearest = bvh.nearest_triangle(Vec3::new(1.5, 4.5, 1.5), 10.0).unwrap();
        assert_relative_eq!(nearest.point.y, 6.0, epsilon = 1e-4);
        
        assert!(bvh.nearest_triangle(Vec3::new(1.5, 2.0, 1.5), 1.0).is_none());
    }
    
    #[test]
    fn test_queries_are_counted() {
        let blob = floor_grid_blob(2, 1.0, 0.0);
        let bvh = build(&blob);
        let mut ids = Vec::new();
        let mut hits = Vec::new();
        
        bvh.box_query(&AABB::new(Vec3::zeros(), Vec3::repeat(1.0)), &mut ids);
        bvh.box_query(&AABB::new(Vec3::zeros(), Vec3::repeat(1.0)), &mut ids);
        bvh.ray_query(&Ray::new(Vec3::new(0.5, 1.0, 0.5), -Vec3::y()), 2.0, RayMode::Nearest, &mut hits);
        
        let stats = bvh.statistics();
        assert_eq!(stats.frame_queries.get(QueryKind::Box), 2);
        assert_eq!(stats.frame_queries.get(QueryKind::Ray), 1);
        
        bvh.reset_frame_statistics();
        let stats = bvh.statistics();
        assert_eq!(stats.frame_queries.total(), 0);
        assert_eq!(stats.total_queries.total(), 3);
    }
}
