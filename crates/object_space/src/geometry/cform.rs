//! Collision form (`.cform`) binary layout
//!
//! A collision form is the static level geometry written by the level build
//! pipeline. All fields are little-endian:
//!
//! ```text
//! offset  size                 field
//! 0       4                    version (must equal CFORM_CURRENT_VERSION)
//! 4       4                    vertex count
//! 8       4                    triangle count
//! 12      24                   bounds: min xyz, max xyz (f32)
//! 36      vertex_count * 12    vertices (3 x f32)
//! ...     triangle_count * 16  triangles (3 x u32 indices + u32 aux)
//! ```
//!
//! The header bounds are trusted as written. Producers must store a box that
//! encloses every vertex; consumers never recompute it on the hot path.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use super::aabb::AABB;

/// The only collision form version this crate reads
pub const CFORM_CURRENT_VERSION: u32 = 4;

/// Size in bytes of the fixed header
pub const CFORM_HEADER_SIZE: usize = std::mem::size_of::<CformHeaderRaw>();

/// Size in bytes of one serialized vertex
pub const CFORM_VERTEX_SIZE: usize = std::mem::size_of::<[f32; 3]>();

/// Size in bytes of one serialized triangle record
pub const CFORM_TRIANGLE_SIZE: usize = std::mem::size_of::<TriangleRecord>();

/// Errors in the content of a collision form
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Header version is not `CFORM_CURRENT_VERSION`
    #[error("collision form version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Supported version
        expected: u32,
        /// Version stored in the file
        found: u32,
    },
    
    /// Stream ended before the data the header promises
    #[error("collision form truncated: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required by the header counts
        expected: u64,
        /// Bytes actually available
        actual: u64,
    },
    
    /// Triangle refers to a vertex that does not exist
    #[error("triangle {triangle} references vertex {index}, but only {vertex_count} vertices exist")]
    VertexIndexOutOfRange {
        /// Offending triangle
        triangle: usize,
        /// Offending vertex index
        index: u32,
        /// Number of vertices in the blob
        vertex_count: usize,
    },
}

/// Header as laid out on disk
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct CformHeaderRaw {
    pub version: u32,
    pub vertex_count: u32,
    pub triangle_count: u32,
    pub bounds: [f32; 6],
}

const _: () = assert!(std::mem::size_of::<CformHeaderRaw>() == 36);

/// Decoded collision form header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionFormHeader {
    /// Format version
    pub version: u32,
    /// Number of vertices following the header
    pub vertex_count: u32,
    /// Number of triangle records following the vertices
    pub triangle_count: u32,
    /// Level bounds, trusted as written
    pub bounds: AABB,
}

impl CollisionFormHeader {
    /// Header for the current version
    pub fn new(vertex_count: u32, triangle_count: u32, bounds: AABB) -> Self {
        Self {
            version: CFORM_CURRENT_VERSION,
            vertex_count,
            triangle_count,
            bounds,
        }
    }
    
    /// Total file size implied by the counts
    pub fn expected_size(&self) -> u64 {
        CFORM_HEADER_SIZE as u64
            + u64::from(self.vertex_count) * CFORM_VERTEX_SIZE as u64
            + u64::from(self.triangle_count) * CFORM_TRIANGLE_SIZE as u64
    }
    
    pub(crate) fn from_raw(raw: &CformHeaderRaw) -> Self {
        Self {
            version: u32::from_le(raw.version),
            vertex_count: u32::from_le(raw.vertex_count),
            triangle_count: u32::from_le(raw.triangle_count),
            bounds: AABB::from_array(raw.bounds.map(f32_from_le)),
        }
    }
    
    pub(crate) fn to_raw(self) -> CformHeaderRaw {
        CformHeaderRaw {
            version: self.version.to_le(),
            vertex_count: self.vertex_count.to_le(),
            triangle_count: self.triangle_count.to_le(),
            bounds: self.bounds.to_array().map(f32_to_le),
        }
    }
}

/// One triangle of the collision form (16 bytes)
///
/// The auxiliary word packs material (bits 0-13), the suppress-shadows flag
/// (bit 14), the suppress-wallmarks flag (bit 15) and the sector (bits 16-31).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct TriangleRecord {
    /// Vertex indices
    pub verts: [u32; 3],
    /// Packed auxiliary data
    pub aux: u32,
}

const _: () = assert!(std::mem::size_of::<TriangleRecord>() == 16);

impl TriangleRecord {
    const MATERIAL_MASK: u32 = 0x3FFF;
    const SUPPRESS_SHADOWS_BIT: u32 = 1 << 14;
    const SUPPRESS_WALLMARKS_BIT: u32 = 1 << 15;
    const SECTOR_SHIFT: u32 = 16;
    
    /// Triangle with no material, flags or sector
    pub fn new(verts: [u32; 3]) -> Self {
        Self { verts, aux: 0 }
    }
    
    /// Set the material id (low 14 bits are kept)
    #[must_use]
    pub fn with_material(mut self, material: u16) -> Self {
        self.aux = (self.aux & !Self::MATERIAL_MASK) | (u32::from(material) & Self::MATERIAL_MASK);
        self
    }
    
    /// Set the sector id
    #[must_use]
    pub fn with_sector(mut self, sector: u16) -> Self {
        self.aux = (self.aux & 0xFFFF) | (u32::from(sector) << Self::SECTOR_SHIFT);
        self
    }
    
    /// Set the suppress-shadows and suppress-wallmarks flags
    #[must_use]
    pub fn with_flags(mut self, suppress_shadows: bool, suppress_wallmarks: bool) -> Self {
        self.aux &= !(Self::SUPPRESS_SHADOWS_BIT | Self::SUPPRESS_WALLMARKS_BIT);
        if suppress_shadows {
            self.aux |= Self::SUPPRESS_SHADOWS_BIT;
        }
        if suppress_wallmarks {
            self.aux |= Self::SUPPRESS_WALLMARKS_BIT;
        }
        self
    }
    
    /// Game material id
    #[allow(clippy::cast_possible_truncation)] // masked to 14 bits
    pub fn material(&self) -> u16 {
        (self.aux & Self::MATERIAL_MASK) as u16
    }
    
    /// Surface casts no shadows
    pub fn suppress_shadows(&self) -> bool {
        self.aux & Self::SUPPRESS_SHADOWS_BIT != 0
    }
    
    /// Surface takes no wallmarks
    pub fn suppress_wallmarks(&self) -> bool {
        self.aux & Self::SUPPRESS_WALLMARKS_BIT != 0
    }
    
    /// Render sector id
    #[allow(clippy::cast_possible_truncation)] // shifted down from 32 bits
    pub fn sector(&self) -> u16 {
        (self.aux >> Self::SECTOR_SHIFT) as u16
    }
    
    pub(crate) fn from_le(self) -> Self {
        Self {
            verts: self.verts.map(u32::from_le),
            aux: u32::from_le(self.aux),
        }
    }
    
    pub(crate) fn to_le(self) -> Self {
        Self {
            verts: self.verts.map(u32::to_le),
            aux: self.aux.to_le(),
        }
    }
}

pub(crate) fn f32_from_le(value: f32) -> f32 {
    f32::from_bits(u32::from_le(value.to_bits()))
}

pub(crate) fn f32_to_le(value: f32) -> f32 {
    f32::from_bits(value.to_bits().to_le())
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_layout_sizes() {
        assert_eq!(CFORM_HEADER_SIZE, 36);
        assert_eq!(CFORM_VERTEX_SIZE, 12);
        assert_eq!(CFORM_TRIANGLE_SIZE, 16);
    }
    
    #[test]
    fn test_expected_size_does_not_overflow() {
        let header = CollisionFormHeader::new(u32::MAX, u32::MAX, AABB::invalid());
        assert_eq!(
            header.expected_size(),
            36 + u64::from(u32::MAX) * 12 + u64::from(u32::MAX) * 16
        );
    }
    
    #[test]
    fn test_triangle_aux_packing() {
        let tri = TriangleRecord::new([0, 1, 2])
            .with_material(0x3ABC)
            .with_sector(513)
            .with_flags(true, false);
        
        assert_eq!(tri.material(), 0x3ABC);
        assert_eq!(tri.sector(), 513);
        assert!(tri.suppress_shadows());
        assert!(!tri.suppress_wallmarks());
        
        let tri = tri.with_flags(false, true).with_material(7);
        assert_eq!(tri.material(), 7);
        assert_eq!(tri.sector(), 513);
        assert!(!tri.suppress_shadows());
        assert!(tri.suppress_wallmarks());
    }
}
