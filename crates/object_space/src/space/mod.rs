//! Object space facade
//!
//! Ties the level geometry, its static collision index and the two dynamic
//! spatial indexes together behind one lifecycle.

mod object_space;

pub use object_space::ObjectSpace;

/// Lifecycle state of an [`ObjectSpace`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpaceState {
    /// No geometry
    Unloaded,
    /// Geometry staged, static index not built yet
    Loaded,
    /// Static index built and dynamic indexes initialized; queries allowed
    Ready,
}

impl std::fmt::Display for SpaceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unloaded => "unloaded",
            Self::Loaded => "loaded",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}
