//! Debug drawing primitives
//!
//! The object space never renders anything itself; it pushes shapes into a
//! caller-owned [`DebugDrawList`] that the renderer drains.

use crate::foundation::math::{Vec3, Vec4};
use crate::geometry::{BoundingSphere, AABB};

/// Color used for the level bounding volume
pub const LEVEL_BOUNDS_COLOR: [f32; 4] = [0.2, 0.8, 1.0, 1.0];

/// Color used for collideable object spheres
pub const COLLIDEABLE_COLOR: [f32; 4] = [1.0, 0.6, 0.1, 1.0];

/// Debug shape primitives that can be rendered for visualization
#[derive(Clone, Debug, PartialEq)]
pub enum DebugShape {
    /// Axis-aligned box between `min` and `max`
    Box {
        /// Minimum corner
        min: Vec3,
        /// Maximum corner
        max: Vec3,
        /// RGBA color
        color: Vec4,
    },
    
    /// Wireframe sphere
    Sphere {
        /// Center in world space
        center: Vec3,
        /// Sphere radius
        radius: f32,
        /// RGBA color
        color: Vec4,
    },
}

/// Shapes queued for one frame
#[derive(Debug, Default)]
pub struct DebugDrawList {
    shapes: Vec<DebugShape>,
    
    /// Master enable/disable flag
    pub enabled: bool,
}

impl DebugDrawList {
    /// Create an enabled, empty list
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            enabled: true,
        }
    }
    
    /// Queue a box
    pub fn draw_aabb(&mut self, aabb: &AABB, color: Vec4) {
        if !self.enabled {
            return;
        }
        
        self.shapes.push(DebugShape::Box {
            min: aabb.min,
            max: aabb.max,
            color,
        });
    }
    
    /// Queue a sphere
    pub fn draw_sphere(&mut self, sphere: &BoundingSphere, color: Vec4) {
        if !self.enabled {
            return;
        }
        
        self.shapes.push(DebugShape::Sphere {
            center: sphere.center,
            radius: sphere.radius,
            color,
        });
    }
    
    /// Queued shapes
    pub fn shapes(&self) -> &[DebugShape] {
        &self.shapes
    }
    
    /// Take all queued shapes, leaving the list empty
    pub fn drain(&mut self) -> Vec<DebugShape> {
        std::mem::take(&mut self.shapes)
    }
    
    /// Number of queued shapes
    pub fn len(&self) -> usize {
        self.shapes.len()
    }
    
    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
