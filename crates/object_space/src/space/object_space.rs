//! The object space: level collision geometry plus dynamic object lookup

use std::cell::RefCell;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, error, info};

use crate::config::ConfigError;
use crate::core::config::ObjectSpaceConfig;
use crate::debug::{DebugDrawList, PerformanceAlert, StatsFont, COLLIDEABLE_COLOR, LEVEL_BOUNDS_COLOR};
use crate::foundation::math::{Vec3, Vec4};
use crate::foundation::time::Stopwatch;
use crate::geometry::{check_bounds, load_cform, read_cform, BoundingSphere, GeometryBlob, LoadError, Ray, AABB};
use crate::spatial::{ObjectHandle, SharedSpatialIndex, SpatialEntry, SpatialType};
use crate::static_index::{BvhBuilder, QueryKind, RayHit, RayMode, StaticIndex, StaticIndexBuilder};
use super::SpaceState;

thread_local! {
    static NEAREST_SCRATCH: RefCell<Vec<SpatialEntry>> = RefCell::new(Vec::new());
}

enum Level {
    Unloaded,
    Loaded {
        geometry: GeometryBlob,
    },
    Ready {
        geometry: GeometryBlob,
        index: Box<dyn StaticIndex>,
    },
}

/// Level collision geometry and proximity queries over game objects
///
/// Owns the geometry blob and the static collision index built from it, and
/// shares the collideable and physics spatial indexes with the simulation
/// layer, which registers and moves objects in them directly.
///
/// Loading takes `&mut self`; every query takes `&self`, so the borrow
/// checker keeps reloads from overlapping concurrent queries.
pub struct ObjectSpace {
    config: ObjectSpaceConfig,
    builder: Box<dyn StaticIndexBuilder>,
    level: Level,
    collideable: Arc<SharedSpatialIndex>,
    physics: Arc<SharedSpatialIndex>,
    nearest_frame: AtomicU64,
    nearest_total: AtomicU64,
}

impl ObjectSpace {
    /// Create an unloaded object space using the default BVH builder
    pub fn new(
        config: ObjectSpaceConfig,
        collideable: Arc<SharedSpatialIndex>,
        physics: Arc<SharedSpatialIndex>,
    ) -> Self {
        Self::with_builder(config, collideable, physics, Box::new(BvhBuilder::default()))
    }
    
    /// Create an unloaded object space with a custom static index builder
    pub fn with_builder(
        config: ObjectSpaceConfig,
        collideable: Arc<SharedSpatialIndex>,
        physics: Arc<SharedSpatialIndex>,
        builder: Box<dyn StaticIndexBuilder>,
    ) -> Self {
        Self {
            config,
            builder,
            level: Level::Unloaded,
            collideable,
            physics,
            nearest_frame: AtomicU64::new(0),
            nearest_total: AtomicU64::new(0),
        }
    }
    
    /// Create an object space together with its own pair of octree indexes
    pub fn from_config(config: ObjectSpaceConfig) -> Self {
        let collideable = Arc::new(SharedSpatialIndex::octree("collideable", config.collideable.clone()));
        let physics = Arc::new(SharedSpatialIndex::octree("physics", config.physics.clone()));
        Self::new(config, collideable, physics)
    }
    
    /// Current lifecycle state
    pub fn state(&self) -> SpaceState {
        match self.level {
            Level::Unloaded => SpaceState::Unloaded,
            Level::Loaded { .. } => SpaceState::Loaded,
            Level::Ready { .. } => SpaceState::Ready,
        }
    }
    
    /// Configuration this space was created with
    pub fn config(&self) -> &ObjectSpaceConfig {
        &self.config
    }
    
    /// Level geometry, once staged
    pub fn geometry(&self) -> Option<&GeometryBlob> {
        match &self.level {
            Level::Unloaded => None,
            Level::Loaded { geometry } | Level::Ready { geometry, .. } => Some(geometry),
        }
    }
    
    /// Level bounding volume, once staged
    pub fn bounds(&self) -> Option<AABB> {
        self.geometry().map(GeometryBlob::bounds)
    }
    
    /// Static collision index, once built
    pub fn static_index(&self) -> Option<&dyn StaticIndex> {
        match &self.level {
            Level::Ready { index, .. } => Some(index.as_ref()),
            _ => None,
        }
    }
    
    /// Index of collideable objects used by `get_nearest`
    pub fn collideable(&self) -> &Arc<SharedSpatialIndex> {
        &self.collideable
    }
    
    /// Index of physics bodies
    pub fn physics(&self) -> &Arc<SharedSpatialIndex> {
        &self.physics
    }
    
    // ---- Loading ----
    
    /// Load the collision form at `path` and build everything from it
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the configuration is invalid or the file is
    /// missing, unreadable or malformed. The space is then left unloaded.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        self.load_with_progress(path, &mut |_| {})
    }
    
    /// [`ObjectSpace::load`] reporting static index build progress
    ///
    /// # Errors
    ///
    /// Same as [`ObjectSpace::load`].
    pub fn load_with_progress(
        &mut self,
        path: impl AsRef<Path>,
        progress: &mut dyn FnMut(f32),
    ) -> Result<(), LoadError> {
        let path = path.as_ref();
        info!("Loading level collision from {}", path.display());
        let result = self.validate_config().and_then(|()| load_cform(path));
        self.finish_load(result, progress)
    }
    
    /// Load the collision form of the configured level
    ///
    /// # Errors
    ///
    /// Same as [`ObjectSpace::load`].
    pub fn load_default(&mut self) -> Result<(), LoadError> {
        self.load_default_with_progress(&mut |_| {})
    }
    
    /// [`ObjectSpace::load_default`] reporting static index build progress
    ///
    /// # Errors
    ///
    /// Same as [`ObjectSpace::load`].
    pub fn load_default_with_progress(&mut self, progress: &mut dyn FnMut(f32)) -> Result<(), LoadError> {
        let path = self.config.default_cform_path();
        self.load_with_progress(path, progress)
    }
    
    /// Decode a collision form from a byte stream and build everything
    ///
    /// # Errors
    ///
    /// Same as [`ObjectSpace::load`].
    pub fn load_from_reader<R: Read>(&mut self, reader: R) -> Result<(), LoadError> {
        self.load_from_reader_with_progress(reader, &mut |_| {})
    }
    
    /// [`ObjectSpace::load_from_reader`] reporting static index build progress
    ///
    /// # Errors
    ///
    /// Same as [`ObjectSpace::load`].
    pub fn load_from_reader_with_progress<R: Read>(
        &mut self,
        reader: R,
        progress: &mut dyn FnMut(f32),
    ) -> Result<(), LoadError> {
        info!("Loading level collision from stream");
        let result = self.validate_config().and_then(|()| read_cform(reader));
        self.finish_load(result, progress)
    }
    
    fn finish_load(
        &mut self,
        result: Result<GeometryBlob, LoadError>,
        progress: &mut dyn FnMut(f32),
    ) -> Result<(), LoadError> {
        match result {
            Ok(blob) => {
                if self.config.verify_bounds {
                    check_bounds(&blob, self.config.bounds_tolerance);
                }
                self.create_with_progress(blob, progress)
            }
            Err(err) => {
                error!("Level collision load failed: {err}");
                self.unload();
                Err(err)
            }
        }
    }
    
    fn validate_config(&self) -> Result<(), LoadError> {
        self.config.validate().map_err(|message| {
            error!("Rejected object space configuration: {message}");
            LoadError::Config(ConfigError::Invalid(message))
        })
    }
    
    /// Build the static index from `blob` and initialize both spatial indexes
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Config`] if the configuration is invalid; the
    /// space is then left unloaded.
    pub fn create(&mut self, blob: GeometryBlob) -> Result<(), LoadError> {
        self.create_with_progress(blob, &mut |_| {})
    }
    
    /// [`ObjectSpace::create`] reporting build progress in `0.0..=1.0`
    ///
    /// # Errors
    ///
    /// Same as [`ObjectSpace::create`].
    pub fn create_with_progress(
        &mut self,
        blob: GeometryBlob,
        progress: &mut dyn FnMut(f32),
    ) -> Result<(), LoadError> {
        if let Err(err) = self.validate_config() {
            self.unload();
            return Err(err);
        }
        
        self.stage_geometry(blob);
        self.build_static(progress);
        Ok(())
    }
    
    /// Replace the current geometry without building anything yet
    ///
    /// Drops any previous geometry and static index and moves to
    /// [`SpaceState::Loaded`].
    pub fn stage_geometry(&mut self, blob: GeometryBlob) {
        if self.state() != SpaceState::Unloaded {
            info!("Replacing level collision ({})", self.state());
        }
        
        debug!(
            "Staged level geometry: {} vertices, {} triangles, bounds {:?}..{:?}",
            blob.vertex_count(),
            blob.triangle_count(),
            blob.bounds().min,
            blob.bounds().max
        );
        self.level = Level::Loaded { geometry: blob };
    }
    
    /// Build the static index for staged geometry and initialize both
    /// spatial indexes with its bounds
    ///
    /// # Panics
    ///
    /// Panics unless the space is in [`SpaceState::Loaded`].
    pub fn build_static(&mut self, progress: &mut dyn FnMut(f32)) {
        let geometry = match std::mem::replace(&mut self.level, Level::Unloaded) {
            Level::Loaded { geometry } => geometry,
            other => {
                self.level = other;
                panic!("ObjectSpace::build_static requires staged geometry, state is {}", self.state());
            }
        };
        
        let stopwatch = Stopwatch::start_new();
        let index = self.builder.build(geometry.vertices(), geometry.triangles(), progress);
        
        let bounds = geometry.bounds();
        self.collideable.initialize(bounds);
        self.physics.initialize(bounds);
        
        info!(
            "Level collision ready: {} triangles, {} vertices, built in {:.2} ms",
            index.triangle_count(),
            geometry.vertex_count(),
            stopwatch.elapsed_millis()
        );
        
        self.level = Level::Ready { geometry, index };
    }
    
    /// Drop geometry and static index
    pub fn unload(&mut self) {
        if self.state() != SpaceState::Unloaded {
            info!("Unloading level collision ({})", self.state());
        }
        self.level = Level::Unloaded;
    }
    
    fn ready_index(&self, operation: &str) -> &dyn StaticIndex {
        match &self.level {
            Level::Ready { index, .. } => index.as_ref(),
            _ => panic!(
                "ObjectSpace::{operation} called while {}; create() must complete first",
                self.state()
            ),
        }
    }
    
    // ---- Proximity queries ----
    
    /// Collect collideable objects whose sphere overlaps `{point, range}`
    ///
    /// `out` is cleared first. `ignore` is never returned. Returns the
    /// number of handles written.
    ///
    /// # Panics
    ///
    /// Panics unless the space is [`SpaceState::Ready`] and `range` is a
    /// finite non-negative number.
    pub fn get_nearest(
        &self,
        out: &mut Vec<ObjectHandle>,
        point: Vec3,
        range: f32,
        ignore: Option<ObjectHandle>,
    ) -> usize {
        NEAREST_SCRATCH.with(|scratch| {
            let mut scratch = scratch.borrow_mut();
            self.get_nearest_with_scratch(&mut scratch, out, point, range, ignore)
        })
    }
    
    /// [`ObjectSpace::get_nearest`] with a caller-provided scratch buffer
    ///
    /// # Panics
    ///
    /// Same as [`ObjectSpace::get_nearest`].
    pub fn get_nearest_with_scratch(
        &self,
        scratch: &mut Vec<SpatialEntry>,
        out: &mut Vec<ObjectHandle>,
        point: Vec3,
        range: f32,
        ignore: Option<ObjectHandle>,
    ) -> usize {
        self.ready_index("get_nearest");
        assert!(
            range.is_finite() && range >= 0.0,
            "get_nearest range must be finite and non-negative, got {range}"
        );
        if let Some(ignore) = ignore {
            debug_assert!(
                self.collideable.contains(ignore),
                "get_nearest ignore handle {ignore:?} is not registered"
            );
        }
        
        self.nearest_frame.fetch_add(1, Ordering::Relaxed);
        self.nearest_total.fetch_add(1, Ordering::Relaxed);
        
        // Broad phase under the index lock, narrow phase after release
        out.clear();
        self.collideable.query_box(scratch, SpatialType::COLLIDEABLE, point, Vec3::repeat(range));
        
        let query = BoundingSphere::new(point, range);
        out.extend(
            scratch
                .iter()
                .filter(|entry| Some(entry.handle) != ignore && entry.sphere.intersects(&query))
                .map(|entry| entry.handle),
        );
        out.len()
    }
    
    /// Collect collideable objects within `range` of `object`'s surface
    ///
    /// Equivalent to `get_nearest(out, center, range + radius, Some(object))`
    /// using the sphere `object` is registered with.
    ///
    /// # Panics
    ///
    /// Panics unless the space is [`SpaceState::Ready`], or if `object` is
    /// not registered in the collideable index.
    pub fn get_nearest_object(&self, out: &mut Vec<ObjectHandle>, object: ObjectHandle, range: f32) -> usize {
        self.ready_index("get_nearest_object");
        let Some(entry) = self.collideable.get(object) else {
            panic!("get_nearest_object: {object:?} is not registered in the collideable index");
        };
        self.get_nearest(out, entry.sphere.center, range + entry.sphere.radius, Some(object))
    }
    
    // ---- Static geometry queries ----
    
    /// Cast a ray against level geometry
    ///
    /// # Panics
    ///
    /// Panics unless the space is [`SpaceState::Ready`].
    pub fn ray_pick(&self, ray: &Ray, max_distance: f32, mode: RayMode, out: &mut Vec<RayHit>) -> usize {
        self.ready_index("ray_pick").ray_query(ray, max_distance, mode, out);
        out.len()
    }
    
    /// Level triangles intersecting a box
    ///
    /// # Panics
    ///
    /// Panics unless the space is [`SpaceState::Ready`].
    pub fn static_box_query(&self, aabb: &AABB, out: &mut Vec<u32>) -> usize {
        self.ready_index("static_box_query").box_query(aabb, out);
        out.len()
    }
    
    // ---- Diagnostics ----
    
    /// Write statistics lines to `font` and raise alerts for exceeded
    /// per-frame query thresholds
    pub fn dump_statistics(&self, font: &mut dyn StatsFont, alert: Option<&mut dyn PerformanceAlert>) {
        let Some(index) = self.static_index() else {
            font.out_line(&format!("object space: {}", self.state()));
            return;
        };
        
        let stats = index.statistics();
        for line in stats.lines() {
            font.out_line(&line);
        }
        
        let nearest_frame = self.nearest_frame.load(Ordering::Relaxed);
        font.out_line(&format!(
            "nearest: {} this frame, {} total",
            nearest_frame,
            self.nearest_total.load(Ordering::Relaxed)
        ));
        for shared in [&self.collideable, &self.physics] {
            font.out_line(&format!("{}: {} objects", shared.name(), shared.len()));
        }
        
        let Some(alert) = alert else {
            return;
        };
        
        let limits = &self.config.stats;
        let frame = stats.frame_queries;
        let checks = [
            ("static ray queries", frame.get(QueryKind::Ray), limits.alert_ray_queries_per_frame),
            (
                "static box/sphere queries",
                frame.get(QueryKind::Box) + frame.get(QueryKind::Sphere),
                limits.alert_box_queries_per_frame,
            ),
            ("nearest queries", nearest_frame, limits.alert_nearest_queries_per_frame),
        ];
        for (label, count, limit) in checks {
            if let Some(limit) = limit.filter(|&limit| count > limit) {
                alert.raise(&format!("{label}: {count} per frame (limit {limit})"));
            }
        }
    }
    
    /// Zero per-frame query counters
    pub fn reset_frame_statistics(&self) {
        self.nearest_frame.store(0, Ordering::Relaxed);
        if let Some(index) = self.static_index() {
            index.reset_frame_statistics();
        }
    }
    
    /// Queue the level bounds and every collideable sphere for drawing
    pub fn debug_render(&self, draw: &mut DebugDrawList) {
        let Some(bounds) = self.bounds() else {
            return;
        };
        
        draw.draw_aabb(&bounds, Vec4::from(LEVEL_BOUNDS_COLOR));
        let color = Vec4::from(COLLIDEABLE_COLOR);
        self.collideable.for_each_entry(|entry| {
            if entry.types.contains(SpatialType::COLLIDEABLE) {
                draw.draw_sphere(&entry.sphere, color);
            }
        });
    }
}

impl std::fmt::Debug for ObjectSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectSpace")
            .field("state", &self.state())
            .field("bounds", &self.bounds())
            .field("collideable", &self.collideable)
            .field("physics", &self.physics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::{AlertLog, StatsLines};
    use crate::tests::support::floor_grid_blob;
    
    fn ready_space() -> ObjectSpace {
        let mut space = ObjectSpace::from_config(ObjectSpaceConfig::default());
        space.create(floor_grid_blob(4, 1.0, 0.0)).unwrap();
        space
    }
    
    #[test]
    fn test_object_space_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ObjectSpace>();
    }
    
    #[test]
    fn test_stage_then_build() {
        let mut space = ObjectSpace::from_config(ObjectSpaceConfig::default());
        assert_eq!(space.state(), SpaceState::Unloaded);
        assert!(space.bounds().is_none());
        
        let blob = floor_grid_blob(2, 1.0, 0.0);
        let bounds = blob.bounds();
        space.stage_geometry(blob);
        assert_eq!(space.state(), SpaceState::Loaded);
        assert_eq!(space.bounds(), Some(bounds));
        assert!(space.static_index().is_none());
        
        let mut reports = Vec::new();
        space.build_static(&mut |p| reports.push(p));
        assert_eq!(space.state(), SpaceState::Ready);
        assert_eq!(reports.last().copied(), Some(1.0));
        assert_eq!(space.collideable().bounds(), Some(bounds));
        assert_eq!(space.physics().bounds(), Some(bounds));
        assert_eq!(space.static_index().map(|index| index.triangle_count()), Some(8));
    }
    
    #[test]
    #[should_panic(expected = "requires staged geometry")]
    fn test_build_without_geometry_panics() {
        let mut space = ObjectSpace::from_config(ObjectSpaceConfig::default());
        space.build_static(&mut |_| {});
    }
    
    #[test]
    fn test_invalid_config_fails_create() {
        let config = ObjectSpaceConfig::default().with_cform_file_name("");
        let mut space = ObjectSpace::from_config(config);
        let err = space.create(floor_grid_blob(2, 1.0, 0.0)).unwrap_err();
        assert!(matches!(err, LoadError::Config(ConfigError::Invalid(_))));
        assert_eq!(space.state(), SpaceState::Unloaded);
    }
    
    #[test]
    fn test_static_queries_forward_to_index() {
        let space = ready_space();
        let mut hits = Vec::new();
        let ray = Ray::new(Vec3::new(1.3, 10.0, 1.6), -Vec3::y());
        assert_eq!(space.ray_pick(&ray, 100.0, RayMode::Nearest, &mut hits), 1);
        assert!((hits[0].distance - 10.0).abs() < 1e-4);
        
        let mut ids = Vec::new();
        let everything = AABB::new(Vec3::repeat(-1.0), Vec3::repeat(5.0));
        assert_eq!(space.static_box_query(&everything, &mut ids), 32);
    }
    
    #[test]
    fn test_statistics_and_alerts() {
        let config = ObjectSpaceConfig::default().with_stats(crate::core::config::StatsConfig {
            alert_ray_queries_per_frame: Some(1),
            alert_box_queries_per_frame: None,
            alert_nearest_queries_per_frame: Some(0),
        });
        let mut space = ObjectSpace::from_config(config);
        space.create(floor_grid_blob(2, 1.0, 0.0)).unwrap();
        
        let mut hits = Vec::new();
        let ray = Ray::new(Vec3::new(0.5, 1.0, 0.5), -Vec3::y());
        space.ray_pick(&ray, 10.0, RayMode::Any, &mut hits);
        space.ray_pick(&ray, 10.0, RayMode::Any, &mut hits);
        let mut out = Vec::new();
        space.get_nearest(&mut out, Vec3::zeros(), 1.0, None);
        
        let mut font = StatsLines::default();
        let mut alerts = AlertLog::default();
        space.dump_statistics(&mut font, Some(&mut alerts));
        assert!(font.lines.iter().any(|line| line.starts_with("nearest: 1 this frame")));
        assert!(font.lines.iter().any(|line| line == "collideable: 0 objects"));
        assert_eq!(alerts.alerts.len(), 2);
        assert!(alerts.alerts[0].starts_with("static ray queries: 2"));
        assert!(alerts.alerts[1].starts_with("nearest queries: 1"));
        
        space.reset_frame_statistics();
        let mut alerts = AlertLog::default();
        space.dump_statistics(&mut StatsLines::default(), Some(&mut alerts));
        assert!(alerts.alerts.is_empty());
    }
    
    #[test]
    fn test_dump_statistics_when_unloaded() {
        let space = ObjectSpace::from_config(ObjectSpaceConfig::default());
        let mut font = StatsLines::default();
        space.dump_statistics(&mut font, None);
        assert_eq!(font.lines, vec!["object space: unloaded".to_string()]);
    }
}
