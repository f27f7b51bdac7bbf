//! Immutable level geometry

use crate::foundation::math::Vec3;
use super::aabb::AABB;
use super::cform::{CollisionFormHeader, FormatError, TriangleRecord};
use super::primitives::Triangle;

/// Vertex and triangle arrays of a level plus its bounding volume
///
/// Immutable once constructed. A level reload replaces the whole blob.
#[derive(Debug, Clone)]
pub struct GeometryBlob {
    vertices: Vec<Vec3>,
    triangles: Vec<TriangleRecord>,
    bounds: AABB,
}

impl GeometryBlob {
    /// Create a blob from generated geometry with caller-supplied bounds
    ///
    /// The bounds are trusted, exactly like collision form header bounds.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::VertexIndexOutOfRange`] if a triangle refers to
    /// a vertex past the end of `vertices`.
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<TriangleRecord>, bounds: AABB) -> Result<Self, FormatError> {
        validate_indices(vertices.len(), &triangles)?;
        Ok(Self { vertices, triangles, bounds })
    }
    
    /// Create a blob and derive its bounds from the vertices
    ///
    /// An empty vertex list yields a zero-sized box at the origin.
    ///
    /// # Errors
    ///
    /// Same as [`GeometryBlob::new`].
    pub fn with_computed_bounds(vertices: Vec<Vec3>, triangles: Vec<TriangleRecord>) -> Result<Self, FormatError> {
        let bounds = AABB::from_points(&vertices).unwrap_or_else(|| AABB::new(Vec3::zeros(), Vec3::zeros()));
        Self::new(vertices, triangles, bounds)
    }
    
    /// Vertex positions
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }
    
    /// Triangle records
    pub fn triangles(&self) -> &[TriangleRecord] {
        &self.triangles
    }
    
    /// Trusted level bounds
    pub fn bounds(&self) -> AABB {
        self.bounds
    }
    
    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
    
    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
    
    /// Resolve a triangle record into world-space positions
    pub fn triangle(&self, index: usize) -> Option<Triangle> {
        let record = self.triangles.get(index)?;
        Some(self.resolve(record))
    }
    
    /// Iterate all triangles as world-space positions
    pub fn iter_triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.triangles.iter().map(|record| self.resolve(record))
    }
    
    /// Box that actually encloses the vertices, ignoring the stored bounds
    pub fn computed_bounds(&self) -> Option<AABB> {
        AABB::from_points(&self.vertices)
    }
    
    /// Header describing this blob in the current format version
    ///
    /// # Panics
    ///
    /// Panics if either count exceeds `u32::MAX`, which the format cannot store.
    pub fn header(&self) -> CollisionFormHeader {
        let vertex_count = u32::try_from(self.vertices.len()).unwrap_or_else(|_| {
            panic!("collision form cannot hold {} vertices", self.vertices.len())
        });
        let triangle_count = u32::try_from(self.triangles.len()).unwrap_or_else(|_| {
            panic!("collision form cannot hold {} triangles", self.triangles.len())
        });
        CollisionFormHeader::new(vertex_count, triangle_count, self.bounds)
    }
    
    fn resolve(&self, record: &TriangleRecord) -> Triangle {
        let [a, b, c] = record.verts;
        Triangle::new(
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        )
    }
}

fn validate_indices(vertex_count: usize, triangles: &[TriangleRecord]) -> Result<(), FormatError> {
    for (triangle, record) in triangles.iter().enumerate() {
        if let Some(&index) = record.verts.iter().find(|&&index| index as usize >= vertex_count) {
            return Err(FormatError::VertexIndexOutOfRange {
                triangle,
                index,
                vertex_count,
            });
        }
    }
    Ok(())
}
