//! Build and query statistics for the static collision index

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Kinds of static query that are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Ray casts
    Ray,
    /// Box overlap queries
    Box,
    /// Sphere overlap queries
    Sphere,
    /// Point containment queries
    Point,
    /// Nearest-triangle queries
    Nearest,
}

impl QueryKind {
    /// Every kind, in reporting order
    pub const ALL: [QueryKind; 5] = [Self::Ray, Self::Box, Self::Sphere, Self::Point, Self::Nearest];
    
    /// Short label for statistics output
    pub fn label(self) -> &'static str {
        match self {
            Self::Ray => "ray",
            Self::Box => "box",
            Self::Sphere => "sphere",
            Self::Point => "point",
            Self::Nearest => "nearest",
        }
    }
    
    fn slot(self) -> usize {
        match self {
            Self::Ray => 0,
            Self::Box => 1,
            Self::Sphere => 2,
            Self::Point => 3,
            Self::Nearest => 4,
        }
    }
}

/// Query counts per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryCounts([u64; 5]);

impl QueryCounts {
    /// Count for one kind
    pub fn get(&self, kind: QueryKind) -> u64 {
        self.0[kind.slot()]
    }
    
    /// Sum over all kinds
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }
}

/// Lock-free counters bumped by concurrent readers
///
/// Relaxed ordering is enough: counts are diagnostics and never
/// synchronize other memory.
#[derive(Debug, Default)]
pub struct QueryCounters {
    frame: [AtomicU64; 5],
    total: [AtomicU64; 5],
}

impl QueryCounters {
    /// Count one query
    pub fn record(&self, kind: QueryKind) {
        self.frame[kind.slot()].fetch_add(1, Ordering::Relaxed);
        self.total[kind.slot()].fetch_add(1, Ordering::Relaxed);
    }
    
    /// Queries since the last `reset_frame`
    pub fn frame(&self) -> QueryCounts {
        QueryCounts(std::array::from_fn(|i| self.frame[i].load(Ordering::Relaxed)))
    }
    
    /// Queries since the index was built
    pub fn total(&self) -> QueryCounts {
        QueryCounts(std::array::from_fn(|i| self.total[i].load(Ordering::Relaxed)))
    }
    
    /// Zero the per-frame counts
    pub fn reset_frame(&self) {
        for counter in &self.frame {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Snapshot of a static index's shape and usage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticIndexStats {
    /// Triangles indexed
    pub triangle_count: usize,
    /// Total tree nodes
    pub node_count: usize,
    /// Leaf nodes
    pub leaf_count: usize,
    /// Deepest node (root = 0)
    pub max_depth: u32,
    /// Wall time spent building
    pub build_time: Duration,
    /// Approximate heap footprint in bytes
    pub memory_bytes: usize,
    /// Queries this frame
    pub frame_queries: QueryCounts,
    /// Queries since build
    pub total_queries: QueryCounts,
}

impl StaticIndexStats {
    /// Human-readable lines for a statistics overlay
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "static: {} tris, {} nodes ({} leaves), depth {}",
                self.triangle_count, self.node_count, self.leaf_count, self.max_depth
            ),
            format!(
                "static: built in {:.2} ms, {:.1} KiB",
                self.build_time.as_secs_f64() * 1000.0,
                self.memory_bytes as f64 / 1024.0
            ),
        ];
        
        for kind in QueryKind::ALL {
            lines.push(format!(
                "static {}: {} this frame, {} total",
                kind.label(),
                self.frame_queries.get(kind),
                self.total_queries.get(kind)
            ));
        }
        
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_frame_reset_keeps_totals() {
        let counters = QueryCounters::default();
        counters.record(QueryKind::Ray);
        counters.record(QueryKind::Ray);
        counters.record(QueryKind::Box);
        
        assert_eq!(counters.frame().get(QueryKind::Ray), 2);
        assert_eq!(counters.frame().total(), 3);
        
        counters.reset_frame();
        assert_eq!(counters.frame().total(), 0);
        assert_eq!(counters.total().get(QueryKind::Ray), 2);
        assert_eq!(counters.total().get(QueryKind::Box), 1);
    }
    
    #[test]
    fn test_stats_lines_cover_every_query_kind() {
        let stats = StaticIndexStats {
            triangle_count: 12,
            node_count: 7,
            leaf_count: 4,
            ..StaticIndexStats::default()
        };
        let lines = stats.lines();
        assert_eq!(lines.len(), 2 + QueryKind::ALL.len());
        assert!(lines[0].contains("12 tris"));
        assert!(lines.iter().any(|line| line.starts_with("static nearest")));
    }
}
