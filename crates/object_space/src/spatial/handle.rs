//! Handles and type tags for objects registered in spatial indexes

use bitflags::bitflags;

slotmap::new_key_type! {
    /// Opaque handle to a game object owned by the simulation layer
    ///
    /// Generational: a handle of a removed object never matches a later one.
    pub struct ObjectHandle;
}

bitflags! {
    /// Spatial partitions an entry takes part in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SpatialType: u32 {
        /// Found by proximity queries (`get_nearest`)
        const COLLIDEABLE = 1 << 0;
        /// Simulated rigid body
        const RIGID_BODY  = 1 << 1;
        /// Light source
        const LIGHT       = 1 << 2;
        /// Has a visual
        const RENDERABLE  = 1 << 3;
        /// Sound emitter
        const SOUND       = 1 << 4;
        /// Glow sprite
        const GLOW        = 1 << 5;
        /// AI obstacle
        const OBSTACLE    = 1 << 6;
        /// Trigger or restrictor shape
        const SHAPE       = 1 << 7;
    }
}
