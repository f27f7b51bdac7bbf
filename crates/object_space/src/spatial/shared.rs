//! Lock-guarded spatial index shared between threads

use std::sync::{Mutex, MutexGuard};

use crate::foundation::math::Vec3;
use crate::geometry::{BoundingSphere, AABB};
use super::{ObjectHandle, OctreeConfig, OctreeSpatialIndex, SpatialEntry, SpatialIndex, SpatialType};

/// A [`SpatialIndex`] behind one mutex
///
/// Every method takes the lock for exactly that call, so a query never
/// observes a half-applied insert or removal. Hand it around as
/// `Arc<SharedSpatialIndex>`.
pub struct SharedSpatialIndex {
    name: String,
    inner: Mutex<Box<dyn SpatialIndex>>,
}

impl SharedSpatialIndex {
    /// Wrap an index
    pub fn new(name: impl Into<String>, index: Box<dyn SpatialIndex>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(index),
        }
    }
    
    /// Wrap a fresh octree index
    pub fn octree(name: impl Into<String>, config: OctreeConfig) -> Self {
        Self::new(name, Box::new(OctreeSpatialIndex::new(config)))
    }
    
    /// Name used in logs and statistics
    pub fn name(&self) -> &str {
        &self.name
    }
    
    fn lock(&self) -> MutexGuard<'_, Box<dyn SpatialIndex>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("{} spatial index lock poisoned by a panicking writer", self.name),
        }
    }
    
    /// Set the coordinate extent and drop all entries
    pub fn initialize(&self, bounds: AABB) {
        self.lock().initialize(bounds);
    }
    
    /// Bounds given to the last `initialize`
    pub fn bounds(&self) -> Option<AABB> {
        self.lock().bounds()
    }
    
    /// Register an object, replacing any previous entry
    pub fn insert(&self, handle: ObjectHandle, sphere: BoundingSphere, types: SpatialType) {
        self.lock().insert(handle, sphere, types);
    }
    
    /// Move a registered object
    ///
    /// Returns `false` (and trips a debug assertion) if it is not registered.
    pub fn update(&self, handle: ObjectHandle, sphere: BoundingSphere) -> bool {
        let updated = self.lock().update(handle, sphere);
        debug_assert!(updated, "update of unregistered object {handle:?} in {} index", self.name);
        updated
    }
    
    /// Unregister an object
    ///
    /// Returns `false` (and trips a debug assertion) if it is not registered.
    pub fn remove(&self, handle: ObjectHandle) -> bool {
        let removed = self.lock().remove(handle);
        debug_assert!(removed, "removal of unregistered object {handle:?} from {} index", self.name);
        removed
    }
    
    /// Range query into `out`; see [`SpatialIndex::query_box`]
    pub fn query_box(&self, out: &mut Vec<SpatialEntry>, mask: SpatialType, center: Vec3, half_extents: Vec3) {
        self.lock().query_box(out, mask, center, half_extents);
    }
    
    /// Registered entry for `handle`
    pub fn get(&self, handle: ObjectHandle) -> Option<SpatialEntry> {
        self.lock().get(handle)
    }
    
    /// Check whether `handle` is registered
    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.lock().contains(handle)
    }
    
    /// Number of registered objects
    pub fn len(&self) -> usize {
        self.lock().len()
    }
    
    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
    
    /// Drop all entries
    pub fn clear(&self) {
        self.lock().clear();
    }
    
    /// Visit every entry while holding the lock
    ///
    /// `visit` must not call back into this index.
    pub fn for_each_entry(&self, mut visit: impl FnMut(&SpatialEntry)) {
        self.lock().for_each_entry(&mut visit);
    }
}

impl std::fmt::Debug for SharedSpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSpatialIndex")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::sync::Arc;
    use std::thread;
    
    #[test]
    fn test_shared_index_across_threads() {
        let shared = Arc::new(SharedSpatialIndex::octree("collideable", OctreeConfig::default()));
        shared.initialize(AABB::new(Vec3::repeat(-100.0), Vec3::repeat(100.0)));
        
        let mut handles = SlotMap::<ObjectHandle, ()>::with_key();
        let keys: Vec<_> = (0..64).map(|_| handles.insert(())).collect();
        
        let workers: Vec<_> = keys
            .chunks(16)
            .enumerate()
            .map(|(chunk, keys)| {
                let shared = Arc::clone(&shared);
                let keys = keys.to_vec();
                thread::spawn(move || {
                    for (i, handle) in keys.into_iter().enumerate() {
                        #[allow(clippy::cast_precision_loss)]
                        let center = Vec3::new(chunk as f32 * 10.0, i as f32, 0.0);
                        shared.insert(handle, BoundingSphere::new(center, 0.5), SpatialType::COLLIDEABLE);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        
        assert_eq!(shared.len(), 64);
        assert_eq!(shared.name(), "collideable");
        let mut out = Vec::new();
        shared.query_box(&mut out, SpatialType::COLLIDEABLE, Vec3::new(45.0, 45.0, 0.0), Vec3::repeat(60.0));
        assert_eq!(out.len(), 64);
    }
    
    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "removal of unregistered object")]
    fn test_remove_unregistered_asserts_in_debug() {
        let shared = SharedSpatialIndex::octree("physics", OctreeConfig::default());
        shared.initialize(AABB::new(Vec3::repeat(-1.0), Vec3::repeat(1.0)));
        let mut handles = SlotMap::<ObjectHandle, ()>::with_key();
        shared.remove(handles.insert(()));
    }
}
