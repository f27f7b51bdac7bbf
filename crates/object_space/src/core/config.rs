//! # Unified Configuration System
//!
//! All configuration consumed by the object space lives here: where level
//! files are found, how the collision form is checked on load, how the two
//! dynamic spatial indexes subdivide, and when statistics raise alerts.
//!
//! ## Configuration Categories
//!
//! - **Level Config**: level root, collision form file name, bounds checks
//! - **Spatial Config**: octree tuning for the collideable and physics indexes
//! - **Stats Config**: per-frame query thresholds for performance alerts

use serde::{Serialize, Deserialize};
use std::path::{Path, PathBuf};

use crate::spatial::OctreeConfig;

// Re-export from the config module for convenience
pub use crate::config::{Config, ConfigError};

/// Default collision form file name inside a level directory
pub const DEFAULT_CFORM_FILE_NAME: &str = "level.cform";

/// # Stats Configuration
///
/// Per-frame query counts above which `dump_statistics` raises a
/// performance alert. `None` disables the alert for that query kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Static ray queries per frame
    pub alert_ray_queries_per_frame: Option<u64>,
    /// Static box and sphere queries per frame
    pub alert_box_queries_per_frame: Option<u64>,
    /// `get_nearest` calls per frame
    pub alert_nearest_queries_per_frame: Option<u64>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            alert_ray_queries_per_frame: Some(4096),
            alert_box_queries_per_frame: Some(4096),
            alert_nearest_queries_per_frame: Some(1024),
        }
    }
}

/// # Object Space Configuration
///
/// Top-level configuration for level collision loading and spatial queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSpaceConfig {
    /// Directory of the current level; `load_default` reads from here
    pub level_root: PathBuf,
    /// Collision form file name inside `level_root`
    pub cform_file_name: String,
    /// Recompute vertex bounds on load and warn when the header disagrees
    pub verify_bounds: bool,
    /// Slack allowed before a vertex counts as outside the header bounds
    pub bounds_tolerance: f32,
    /// Log level used by `foundation::logging::init_with_level`
    pub log_level: String,
    /// Octree tuning for the collideable index
    pub collideable: OctreeConfig,
    /// Octree tuning for the physics index
    pub physics: OctreeConfig,
    /// Statistics alert thresholds
    pub stats: StatsConfig,
}

impl ObjectSpaceConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            level_root: PathBuf::from("levels"),
            cform_file_name: DEFAULT_CFORM_FILE_NAME.to_string(),
            verify_bounds: cfg!(debug_assertions),
            bounds_tolerance: 0.01,
            log_level: "info".to_string(),
            collideable: OctreeConfig::default(),
            physics: OctreeConfig::default(),
            stats: StatsConfig::default(),
        }
    }
    
    /// Set the level root directory
    pub fn with_level_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.level_root = root.into();
        self
    }
    
    /// Set the collision form file name
    pub fn with_cform_file_name(mut self, name: impl Into<String>) -> Self {
        self.cform_file_name = name.into();
        self
    }
    
    /// Enable or disable the trusted-bounds check
    pub fn with_bounds_check(mut self, enabled: bool, tolerance: f32) -> Self {
        self.verify_bounds = enabled;
        self.bounds_tolerance = tolerance;
        self
    }
    
    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
    
    /// Set octree tuning for both dynamic indexes
    pub fn with_octree(mut self, octree: OctreeConfig) -> Self {
        self.collideable = octree.clone();
        self.physics = octree;
        self
    }
    
    /// Set statistics thresholds
    pub fn with_stats(mut self, stats: StatsConfig) -> Self {
        self.stats = stats;
        self
    }
    
    /// Path `load_default` reads
    pub fn default_cform_path(&self) -> PathBuf {
        self.level_root.join(&self.cform_file_name)
    }
    
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.cform_file_name.is_empty() {
            return Err("Collision form file name cannot be empty".to_string());
        }
        
        if Path::new(&self.cform_file_name).components().count() != 1 {
            return Err(format!(
                "Collision form file name must not contain directories: {}",
                self.cform_file_name
            ));
        }
        
        if !self.bounds_tolerance.is_finite() || self.bounds_tolerance < 0.0 {
            return Err(format!("Bounds tolerance must be a non-negative number, got {}", self.bounds_tolerance));
        }
        
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(format!("Unknown log level: {}", self.log_level));
        }
        
        self.collideable.validate().map_err(|e| format!("collideable index: {e}"))?;
        self.physics.validate().map_err(|e| format!("physics index: {e}"))?;
        
        Ok(())
    }
}

impl Default for ObjectSpaceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for ObjectSpaceConfig {}
