//! Math utilities and types
//!
//! Thin aliases over `nalgebra` so the rest of the crate speaks in `Vec3`.

pub use nalgebra::{Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type (RGBA colors)
pub type Vec4 = Vector4<f32>;

/// Math utility functions
pub mod utils {
    use super::Vec3;
    
    /// Component-wise minimum of two vectors
    pub fn min_components(a: &Vec3, b: &Vec3) -> Vec3 {
        a.inf(b)
    }
    
    /// Component-wise maximum of two vectors
    pub fn max_components(a: &Vec3, b: &Vec3) -> Vec3 {
        a.sup(b)
    }
    
    /// Index (0 = x, 1 = y, 2 = z) of the largest component
    pub fn largest_axis(v: &Vec3) -> usize {
        if v.x >= v.y && v.x >= v.z {
            0
        } else if v.y >= v.z {
            1
        } else {
            2
        }
    }
}
