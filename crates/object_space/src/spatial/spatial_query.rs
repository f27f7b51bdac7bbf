//! Abstract spatial index interface for dynamic objects
//!
//! Game objects register a bounding sphere and a type mask; range queries
//! return every entry whose volume overlaps the query box. Queries are a
//! broad phase: they may return extra candidates but never miss one.

use slotmap::SecondaryMap;

use crate::foundation::math::Vec3;
use crate::geometry::{BoundingSphere, AABB};
use super::{ObjectHandle, Octree, OctreeConfig, SpatialType};

/// A registered object as stored in a spatial index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    /// Object the entry belongs to
    pub handle: ObjectHandle,
    /// Bounding sphere at the last insert/update
    pub sphere: BoundingSphere,
    /// Partitions the object takes part in
    pub types: SpatialType,
}

/// Mutable index of object bounding spheres
pub trait SpatialIndex: Send + Sync {
    /// Set the coordinate extent and drop all entries
    fn initialize(&mut self, bounds: AABB);
    
    /// Bounds given to the last `initialize`, if any
    fn bounds(&self) -> Option<AABB>;
    
    /// Register an object, replacing any entry it already has
    fn insert(&mut self, handle: ObjectHandle, sphere: BoundingSphere, types: SpatialType);
    
    /// Move an object; `false` if it is not registered
    fn update(&mut self, handle: ObjectHandle, sphere: BoundingSphere) -> bool;
    
    /// Unregister an object; `false` if it is not registered
    fn remove(&mut self, handle: ObjectHandle) -> bool;
    
    /// Clear `out`, then write entries matching `mask` that overlap the box
    fn query_box(&self, out: &mut Vec<SpatialEntry>, mask: SpatialType, center: Vec3, half_extents: Vec3);
    
    /// Registered entry for `handle`
    fn get(&self, handle: ObjectHandle) -> Option<SpatialEntry>;
    
    /// Check whether `handle` is registered
    fn contains(&self, handle: ObjectHandle) -> bool {
        self.get(handle).is_some()
    }
    
    /// Number of registered objects
    fn len(&self) -> usize;
    
    /// True when nothing is registered
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    
    /// Drop all entries, keeping the bounds
    fn clear(&mut self);
    
    /// Visit every registered entry
    fn for_each_entry(&self, visit: &mut dyn FnMut(&SpatialEntry));
}

/// Octree-based implementation of [`SpatialIndex`]
///
/// Keeps a handle-to-entry cache next to the tree so lookups and removals
/// don't search the hierarchy.
pub struct OctreeSpatialIndex {
    config: OctreeConfig,
    octree: Option<Octree>,
    /// Cache of entry data for quick lookups
    entries: SecondaryMap<ObjectHandle, SpatialEntry>,
}

impl OctreeSpatialIndex {
    /// Create an uninitialized index
    pub fn new(config: OctreeConfig) -> Self {
        Self {
            config,
            octree: None,
            entries: SecondaryMap::new(),
        }
    }
    
    /// Underlying octree (for visualization, etc.)
    pub fn octree(&self) -> Option<&Octree> {
        self.octree.as_ref()
    }
    
    fn octree_mut(&mut self) -> &mut Octree {
        match self.octree.as_mut() {
            Some(octree) => octree,
            None => panic!("spatial index modified before initialize"),
        }
    }
}

impl SpatialIndex for OctreeSpatialIndex {
    fn initialize(&mut self, bounds: AABB) {
        self.octree = Some(Octree::new(bounds, self.config.clone()));
        self.entries.clear();
    }
    
    fn bounds(&self) -> Option<AABB> {
        self.octree.as_ref().map(Octree::bounds)
    }
    
    /// # Panics
    ///
    /// Panics if the index has not been initialized.
    fn insert(&mut self, handle: ObjectHandle, sphere: BoundingSphere, types: SpatialType) {
        let Some(octree) = self.octree.as_mut() else {
            panic!("spatial index modified before initialize");
        };
        
        let entry = SpatialEntry { handle, sphere, types };
        if let Some(previous) = self.entries.insert(handle, entry) {
            octree.remove(handle, previous.sphere.center);
        }
        octree.insert(entry);
    }
    
    fn update(&mut self, handle: ObjectHandle, sphere: BoundingSphere) -> bool {
        let Some(cached) = self.entries.get_mut(handle) else {
            return false;
        };
        let old_center = cached.sphere.center;
        cached.sphere = sphere;
        let entry = *cached;
        
        // Octree requires remove + re-insert for moves
        let octree = self.octree_mut();
        octree.remove(handle, old_center);
        octree.insert(entry);
        true
    }
    
    fn remove(&mut self, handle: ObjectHandle) -> bool {
        let Some(entry) = self.entries.remove(handle) else {
            return false;
        };
        self.octree_mut().remove(handle, entry.sphere.center);
        true
    }
    
    fn query_box(&self, out: &mut Vec<SpatialEntry>, mask: SpatialType, center: Vec3, half_extents: Vec3) {
        out.clear();
        if let Some(octree) = &self.octree {
            let query = AABB::from_center_extents(center, half_extents);
            octree.query_box(&query, mask, out);
        }
    }
    
    fn get(&self, handle: ObjectHandle) -> Option<SpatialEntry> {
        self.entries.get(handle).copied()
    }
    
    fn contains(&self, handle: ObjectHandle) -> bool {
        self.entries.contains_key(handle)
    }
    
    fn len(&self) -> usize {
        self.entries.len()
    }
    
    fn clear(&mut self) {
        if let Some(octree) = self.octree.as_mut() {
            octree.clear();
        }
        self.entries.clear();
    }
    
    fn for_each_entry(&self, visit: &mut dyn FnMut(&SpatialEntry)) {
        if let Some(octree) = &self.octree {
            octree.for_each_entry(visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    
    fn index() -> OctreeSpatialIndex {
        let mut index = OctreeSpatialIndex::new(OctreeConfig {
            max_entities_per_node: 4,
            max_depth: 5,
            min_node_size: 5.0,
        });
        index.initialize(AABB::new(Vec3::repeat(-50.0), Vec3::repeat(50.0)));
        index
    }
    
    #[test]
    fn test_spatial_index_insert_remove() {
        let mut handles = SlotMap::<ObjectHandle, ()>::with_key();
        let mut spatial = index();
        
        let handle = handles.insert(());
        spatial.insert(handle, BoundingSphere::new(Vec3::zeros(), 5.0), SpatialType::COLLIDEABLE);
        assert_eq!(spatial.len(), 1);
        assert!(spatial.contains(handle));
        
        assert!(spatial.remove(handle));
        assert!(spatial.is_empty());
        assert!(!spatial.remove(handle));
        assert!(!spatial.update(handle, BoundingSphere::new(Vec3::zeros(), 1.0)));
    }
    
    #[test]
    fn test_reinsert_replaces_entry() {
        let mut handles = SlotMap::<ObjectHandle, ()>::with_key();
        let mut spatial = index();
        let handle = handles.insert(());
        
        spatial.insert(handle, BoundingSphere::new(Vec3::new(10.0, 0.0, 0.0), 1.0), SpatialType::COLLIDEABLE);
        spatial.insert(handle, BoundingSphere::new(Vec3::new(-10.0, 0.0, 0.0), 1.0), SpatialType::LIGHT);
        assert_eq!(spatial.len(), 1);
        
        let mut out = Vec::new();
        spatial.query_box(&mut out, SpatialType::all(), Vec3::zeros(), Vec3::repeat(40.0));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].types, SpatialType::LIGHT);
        assert_eq!(spatial.get(handle).map(|e| e.sphere.center.x), Some(-10.0));
    }
    
    #[test]
    fn test_update_moves_entry() {
        let mut handles = SlotMap::<ObjectHandle, ()>::with_key();
        let mut spatial = index();
        let mut out = Vec::new();
        
        let moving: Vec<_> = (0..12)
            .map(|_| {
                let handle = handles.insert(());
                spatial.insert(handle, BoundingSphere::new(Vec3::new(20.0, 20.0, 20.0), 1.0), SpatialType::COLLIDEABLE);
                handle
            })
            .collect();
        
        assert!(spatial.update(moving[3], BoundingSphere::new(Vec3::new(-30.0, -30.0, -30.0), 1.0)));
        
        spatial.query_box(&mut out, SpatialType::COLLIDEABLE, Vec3::repeat(-30.0), Vec3::repeat(2.0));
        assert_eq!(out.iter().map(|e| e.handle).collect::<Vec<_>>(), vec![moving[3]]);
        
        spatial.query_box(&mut out, SpatialType::COLLIDEABLE, Vec3::repeat(20.0), Vec3::repeat(2.0));
        assert_eq!(out.len(), 11);
        assert!(out.iter().all(|e| e.handle != moving[3]));
    }
    
    #[test]
    fn test_initialize_drops_entries() {
        let mut handles = SlotMap::<ObjectHandle, ()>::with_key();
        let mut spatial = index();
        let handle = handles.insert(());
        spatial.insert(handle, BoundingSphere::new(Vec3::zeros(), 1.0), SpatialType::COLLIDEABLE);
        
        let bounds = AABB::new(Vec3::repeat(-10.0), Vec3::repeat(10.0));
        spatial.initialize(bounds);
        assert!(spatial.is_empty());
        assert_eq!(spatial.bounds(), Some(bounds));
        
        let mut count = 0;
        spatial.for_each_entry(&mut |_| count += 1);
        assert_eq!(count, 0);
    }
    
    #[test]
    fn test_query_before_initialize_is_empty() {
        let spatial = OctreeSpatialIndex::new(OctreeConfig::default());
        let mut out = Vec::new();
        spatial.query_box(&mut out, SpatialType::all(), Vec3::zeros(), Vec3::repeat(1.0));
        assert!(out.is_empty());
        assert!(spatial.bounds().is_none());
    }
    
    #[test]
    #[should_panic(expected = "before initialize")]
    fn test_insert_before_initialize_panics() {
        let mut handles = SlotMap::<ObjectHandle, ()>::with_key();
        let mut spatial = OctreeSpatialIndex::new(OctreeConfig::default());
        spatial.insert(handles.insert(()), BoundingSphere::new(Vec3::zeros(), 1.0), SpatialType::COLLIDEABLE);
    }
}
