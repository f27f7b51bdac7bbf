//! Static level geometry
//!
//! The collision form file format, the immutable geometry blob it decodes
//! into, and the primitive shapes queries are expressed in.

mod aabb;
mod blob;
mod cform;
mod loader;
mod primitives;

pub use aabb::AABB;
pub use blob::GeometryBlob;
pub use cform::{
    CollisionFormHeader, FormatError, TriangleRecord,
    CFORM_CURRENT_VERSION, CFORM_HEADER_SIZE, CFORM_TRIANGLE_SIZE, CFORM_VERTEX_SIZE,
};
pub use loader::{check_bounds, load_cform, parse_cform, read_cform, write_cform, LoadError};
pub use primitives::{BoundingSphere, Ray, Triangle};
