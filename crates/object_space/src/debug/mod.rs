//! Debug visualization and statistics output

mod draw;
mod stats;

pub use draw::{DebugDrawList, DebugShape, COLLIDEABLE_COLOR, LEVEL_BOUNDS_COLOR};
pub use stats::{AlertLog, LogSink, PerformanceAlert, StatsFont, StatsLines};
