//! Octree spatial partitioning structure
//!
//! Divides the level volume into hierarchical regions for fast range
//! queries over bounding spheres. A leaf subdivides into 8 octants once its
//! entry count exceeds the configured threshold. Entries are stored in the
//! node containing their center; queries expand node bounds by the largest
//! registered radius so spheres overhanging their node are still found.
//! Removals shrink that radius again and merge octants that fall back under
//! the subdivision threshold.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;
use crate::geometry::AABB;
use super::{ObjectHandle, SpatialEntry, SpatialType};

/// Configuration for octree behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OctreeConfig {
    /// Maximum entries per node before subdivision
    pub max_entities_per_node: usize,
    
    /// Maximum subdivision depth
    pub max_depth: u32,
    
    /// Minimum node size (prevents excessive subdivision)
    pub min_node_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_entities_per_node: 8,
            max_depth: 8,
            min_node_size: 1.0,
        }
    }
}

impl OctreeConfig {
    /// Check the values can build a usable tree
    pub fn validate(&self) -> Result<(), String> {
        if self.max_entities_per_node == 0 {
            return Err("max_entities_per_node must be at least 1".to_string());
        }
        if !(self.min_node_size.is_finite() && self.min_node_size > 0.0) {
            return Err(format!("min_node_size must be positive, got {}", self.min_node_size));
        }
        Ok(())
    }
}

/// Octant (0-7) of `position` relative to `center`
///
/// Bit 0 is +X, bit 1 is +Y, bit 2 is +Z.
fn octant_index(center: Vec3, position: Vec3) -> usize {
    let x_bit = usize::from(position.x >= center.x);
    let y_bit = usize::from(position.y >= center.y);
    let z_bit = usize::from(position.z >= center.z);
    (z_bit << 2) | (y_bit << 1) | x_bit
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// World-space bounds of this node
    pub bounds: AABB,
    
    /// Entries stored in this node (leaf nodes only)
    pub entries: Vec<SpatialEntry>,
    
    /// Child nodes (8 octants), None if this is a leaf
    pub children: Option<Box<[OctreeNode; 8]>>,
    
    /// Depth in the tree (0 = root)
    pub depth: u32,
}

impl OctreeNode {
    /// Create a new leaf node
    pub fn new(bounds: AABB, depth: u32) -> Self {
        Self {
            bounds,
            entries: Vec::new(),
            children: None,
            depth,
        }
    }
    
    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
    
    /// Subdivide this node into 8 children and push entries down
    fn subdivide(&mut self) {
        if self.children.is_some() {
            return;
        }
        
        let center = self.bounds.center();
        let quarter_extents = self.bounds.extents() * 0.5;
        let depth = self.depth + 1;
        
        let mut children: Box<[OctreeNode; 8]> = Box::new(std::array::from_fn(|octant| {
            let sign = |bit: usize| if octant & bit != 0 { 1.0 } else { -1.0 };
            let child_center = Vec3::new(
                center.x + quarter_extents.x * sign(1),
                center.y + quarter_extents.y * sign(2),
                center.z + quarter_extents.z * sign(4),
            );
            OctreeNode::new(AABB::from_center_extents(child_center, quarter_extents), depth)
        }));
        
        for entry in std::mem::take(&mut self.entries) {
            children[octant_index(center, entry.sphere.center)].entries.push(entry);
        }
        
        self.children = Some(children);
    }
    
    /// Insert an entry below this node
    ///
    /// The caller has already checked the root contains the entry's center;
    /// children accept whatever octant the center falls in.
    fn insert(&mut self, entry: SpatialEntry, config: &OctreeConfig) {
        if self.is_leaf() {
            let should_subdivide = self.entries.len() >= config.max_entities_per_node
                && self.depth < config.max_depth
                && self.bounds.extents().min() > config.min_node_size;
            
            if !should_subdivide {
                self.entries.push(entry);
                return;
            }
            
            self.subdivide();
        }
        
        let octant = octant_index(self.bounds.center(), entry.sphere.center);
        if let Some(children) = self.children.as_mut() {
            children[octant].insert(entry, config);
        }
    }
    
    /// Remove the entry for `handle`, following the octants of `center`
    fn remove(&mut self, handle: ObjectHandle, center: Vec3, config: &OctreeConfig) -> Option<SpatialEntry> {
        if let Some(index) = self.entries.iter().position(|e| e.handle == handle) {
            return Some(self.entries.swap_remove(index));
        }
        
        let octant = octant_index(self.bounds.center(), center);
        let removed = self.children.as_mut()?[octant].remove(handle, center, config)?;
        self.try_collapse(config);
        Some(removed)
    }
    
    /// Merge leaf children back into this node once they fit in one leaf
    fn try_collapse(&mut self, config: &OctreeConfig) {
        let Some(children) = self.children.as_mut() else {
            return;
        };
        if !children.iter().all(OctreeNode::is_leaf) {
            return;
        }
        
        let total: usize = children.iter().map(|child| child.entries.len()).sum();
        if total > config.max_entities_per_node {
            return;
        }
        
        for child in children.iter_mut() {
            self.entries.append(&mut child.entries);
        }
        self.children = None;
    }
    
    /// Collect entries whose sphere bounds overlap `query`
    fn query_box(
        &self,
        query: &AABB,
        mask: SpatialType,
        max_entity_radius: f32,
        results: &mut Vec<SpatialEntry>,
    ) {
        if !self.bounds.expanded(max_entity_radius).intersects(query) {
            return;
        }
        
        results.extend(
            self.entries
                .iter()
                .filter(|entry| entry.types.intersects(mask) && entry.sphere.bounds().intersects(query)),
        );
        
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query_box(query, mask, max_entity_radius, results);
            }
        }
    }
    
    fn for_each_entry(&self, visit: &mut dyn FnMut(&SpatialEntry)) {
        for entry in &self.entries {
            visit(entry);
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.for_each_entry(visit);
            }
        }
    }
    
    /// Count nodes in this subtree
    fn count_nodes(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map_or(0, |children| children.iter().map(Self::count_nodes).sum())
    }
}

/// Octree over bounding spheres
///
/// Entries whose center lies outside the root bounds are kept in a flat
/// outlier list and tested by every query.
#[derive(Debug, Clone)]
pub struct Octree {
    /// Root node containing the level volume
    pub root: OctreeNode,
    
    outliers: Vec<SpatialEntry>,
    
    config: OctreeConfig,
    
    /// Largest radius currently stored
    max_entity_radius: f32,
    
    /// Entries whose radius equals `max_entity_radius`
    max_radius_count: usize,
    
    len: usize,
}

impl Octree {
    /// Create an empty octree covering `world_bounds`
    pub fn new(world_bounds: AABB, config: OctreeConfig) -> Self {
        Self {
            root: OctreeNode::new(world_bounds, 0),
            outliers: Vec::new(),
            config,
            max_entity_radius: 0.0,
            max_radius_count: 0,
            len: 0,
        }
    }
    
    /// Bounds of the root node
    pub fn bounds(&self) -> AABB {
        self.root.bounds
    }
    
    /// Insert an entry
    ///
    /// Returns `false` when the center lies outside the root bounds and the
    /// entry went to the outlier list instead.
    pub fn insert(&mut self, entry: SpatialEntry) -> bool {
        let radius = entry.sphere.radius;
        if radius > self.max_entity_radius {
            self.max_entity_radius = radius;
            self.max_radius_count = 1;
        } else if radius == self.max_entity_radius {
            self.max_radius_count += 1;
        }
        self.len += 1;
        
        if self.root.bounds.contains_point(entry.sphere.center) {
            self.root.insert(entry, &self.config);
            true
        } else {
            self.outliers.push(entry);
            false
        }
    }
    
    /// Remove the entry for `handle` that was inserted with center `center`
    pub fn remove(&mut self, handle: ObjectHandle, center: Vec3) -> Option<SpatialEntry> {
        let removed = if self.root.bounds.contains_point(center) {
            self.root.remove(handle, center, &self.config)
        } else {
            self.outliers
                .iter()
                .position(|e| e.handle == handle)
                .map(|index| self.outliers.swap_remove(index))
        };
        
        if let Some(entry) = &removed {
            self.len -= 1;
            if entry.sphere.radius == self.max_entity_radius {
                self.max_radius_count = self.max_radius_count.saturating_sub(1);
                if self.max_radius_count == 0 {
                    self.recompute_max_radius();
                }
            }
        }
        removed
    }
    
    fn recompute_max_radius(&mut self) {
        let mut max_radius = 0.0_f32;
        let mut count = 0;
        self.for_each_entry(&mut |entry| {
            let radius = entry.sphere.radius;
            if radius > max_radius {
                max_radius = radius;
                count = 1;
            } else if radius == max_radius {
                count += 1;
            }
        });
        self.max_entity_radius = max_radius;
        self.max_radius_count = count;
    }
    
    /// Largest radius currently stored; node bounds are expanded by it
    pub fn max_entity_radius(&self) -> f32 {
        self.max_entity_radius
    }
    
    /// Append entries matching `mask` whose sphere bounds overlap `query`
    pub fn query_box(&self, query: &AABB, mask: SpatialType, results: &mut Vec<SpatialEntry>) {
        self.root.query_box(query, mask, self.max_entity_radius, results);
        results.extend(
            self.outliers
                .iter()
                .filter(|entry| entry.types.intersects(mask) && entry.sphere.bounds().intersects(query)),
        );
    }
    
    /// Visit every entry, tree first, then outliers
    pub fn for_each_entry(&self, visit: &mut dyn FnMut(&SpatialEntry)) {
        self.root.for_each_entry(visit);
        for entry in &self.outliers {
            visit(entry);
        }
    }
    
    /// Number of entries
    pub fn len(&self) -> usize {
        self.len
    }
    
    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    
    /// Number of entries outside the root bounds
    pub fn outlier_count(&self) -> usize {
        self.outliers.len()
    }
    
    /// Total nodes in the tree
    pub fn node_count(&self) -> usize {
        self.root.count_nodes()
    }
    
    /// Drop every entry, keeping the bounds
    pub fn clear(&mut self) {
        self.root = OctreeNode::new(self.root.bounds, 0);
        self.outliers.clear();
        self.max_entity_radius = 0.0;
        self.max_radius_count = 0;
        self.len = 0;
    }
}
