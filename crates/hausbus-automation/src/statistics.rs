//! Time-series statistics boundary

use std::time::Duration;

/// Read access to the append-only statistics store.
///
/// Series are keyed by position path id; the automation core only ever
/// reads recent aggregates, never writes.
pub trait StatisticsStore: Send + Sync {
    fn recent_average(&self, series: &str, window: Duration) -> Option<f32>;
}

/// Store that has no data, for deployments without statistics collection.
pub struct NoStatistics;

impl StatisticsStore for NoStatistics {
    fn recent_average(&self, _series: &str, _window: Duration) -> Option<f32> {
        None
    }
}
