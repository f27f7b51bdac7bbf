//! Collision form reading and writing

use std::io::{self, Read, Write};
use std::path::Path;

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::ConfigError;
use crate::foundation::math::Vec3;
use super::blob::GeometryBlob;
use super::cform::{
    f32_from_le, f32_to_le, CformHeaderRaw, CollisionFormHeader, FormatError, TriangleRecord,
    CFORM_CURRENT_VERSION, CFORM_HEADER_SIZE, CFORM_TRIANGLE_SIZE, CFORM_VERTEX_SIZE,
};

/// Errors that abort a level load
#[derive(Debug, Error)]
pub enum LoadError {
    /// File missing or unreadable
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    
    /// File read but its content is unusable
    #[error("Invalid collision form: {0}")]
    Format(#[from] FormatError),
    
    /// Configuration rejected before loading
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LoadError {
    /// The format error, if this is one
    pub fn format_error(&self) -> Option<&FormatError> {
        match self {
            Self::Format(err) => Some(err),
            _ => None,
        }
    }
}

/// Read and decode a collision form file
///
/// # Errors
///
/// Returns [`LoadError::Io`] if the file cannot be opened or read, and
/// [`LoadError::Format`] if its content is invalid.
pub fn load_cform<P: AsRef<Path>>(path: P) -> Result<GeometryBlob, LoadError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let blob = parse_cform(&data)?;
    info!(
        "Loaded collision form {}: {} vertices, {} triangles",
        path.display(),
        blob.vertex_count(),
        blob.triangle_count()
    );
    Ok(blob)
}

/// Decode a collision form from any byte stream
///
/// The stream is read to its end.
///
/// # Errors
///
/// Same as [`load_cform`].
pub fn read_cform<R: Read>(mut reader: R) -> Result<GeometryBlob, LoadError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(parse_cform(&data)?)
}

/// Decode a collision form held in memory
///
/// The version is checked before any size check, so an unsupported file is
/// always reported as [`FormatError::VersionMismatch`].
///
/// # Errors
///
/// Returns [`FormatError::VersionMismatch`], [`FormatError::Truncated`] or
/// [`FormatError::VertexIndexOutOfRange`].
#[allow(clippy::cast_possible_truncation)] // sizes are checked against data.len() first
pub fn parse_cform(data: &[u8]) -> Result<GeometryBlob, FormatError> {
    if let Some(version_bytes) = data.get(..4) {
        let version = u32::from_le_bytes([version_bytes[0], version_bytes[1], version_bytes[2], version_bytes[3]]);
        if version != CFORM_CURRENT_VERSION {
            return Err(FormatError::VersionMismatch {
                expected: CFORM_CURRENT_VERSION,
                found: version,
            });
        }
    }
    
    if data.len() < CFORM_HEADER_SIZE {
        return Err(FormatError::Truncated {
            expected: CFORM_HEADER_SIZE as u64,
            actual: data.len() as u64,
        });
    }
    
    let raw: CformHeaderRaw = bytemuck::pod_read_unaligned(&data[..CFORM_HEADER_SIZE]);
    let header = CollisionFormHeader::from_raw(&raw);
    
    let expected = header.expected_size();
    if (data.len() as u64) < expected {
        return Err(FormatError::Truncated {
            expected,
            actual: data.len() as u64,
        });
    }
    if (data.len() as u64) > expected {
        debug!("Ignoring {} trailing bytes after collision form", data.len() as u64 - expected);
    }
    
    let vertex_start = CFORM_HEADER_SIZE;
    let vertex_end = vertex_start + header.vertex_count as usize * CFORM_VERTEX_SIZE;
    let triangle_end = vertex_end + header.triangle_count as usize * CFORM_TRIANGLE_SIZE;
    
    let vertices: Vec<Vec3> = data[vertex_start..vertex_end]
        .chunks_exact(CFORM_VERTEX_SIZE)
        .map(|chunk| {
            let [x, y, z] = bytemuck::pod_read_unaligned::<[f32; 3]>(chunk).map(f32_from_le);
            Vec3::new(x, y, z)
        })
        .collect();
    
    let triangles: Vec<TriangleRecord> = data[vertex_end..triangle_end]
        .chunks_exact(CFORM_TRIANGLE_SIZE)
        .map(|chunk| bytemuck::pod_read_unaligned::<TriangleRecord>(chunk).from_le())
        .collect();
    
    GeometryBlob::new(vertices, triangles, header.bounds)
}

/// Encode a blob as a collision form
///
/// # Errors
///
/// Propagates any error from `writer`.
///
/// # Panics
///
/// Panics if the blob holds more than `u32::MAX` vertices or triangles.
pub fn write_cform<W: Write>(mut writer: W, blob: &GeometryBlob) -> io::Result<()> {
    writer.write_all(bytemuck::bytes_of(&blob.header().to_raw()))?;
    
    for vertex in blob.vertices() {
        let raw = [vertex.x, vertex.y, vertex.z].map(f32_to_le);
        writer.write_all(bytemuck::bytes_of(&raw))?;
    }
    
    for triangle in blob.triangles() {
        writer.write_all(bytemuck::bytes_of(&triangle.to_le()))?;
    }
    
    writer.flush()
}

/// Compare the trusted bounds against the vertices
///
/// Logs a warning and returns `false` when some vertex lies more than
/// `tolerance` outside the stored bounds. Never fails the load.
pub fn check_bounds(blob: &GeometryBlob, tolerance: f32) -> bool {
    let Some(actual) = blob.computed_bounds() else {
        return true;
    };
    
    let stored = blob.bounds().expanded(tolerance);
    if stored.contains(&actual) {
        return true;
    }
    
    warn!(
        "Collision form bounds {:?}..{:?} do not enclose vertex bounds {:?}..{:?}",
        blob.bounds().min.as_slice(),
        blob.bounds().max.as_slice(),
        actual.min.as_slice(),
        actual.max.as_slice()
    );
    false
}
