// Snapshot cache - Single-writer, lock-free holder of the current snapshot
use crate::domain::errors::QueryError;
use crate::domain::snapshot::{Snapshot, SnapshotPayload};
use crate::infrastructure::checksum::content_checksum;
use arc_swap::ArcSwapOption;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { checksum: String },
    Unchanged { checksum: String },
}

/// Readers take an `Arc` of the whole snapshot, so a publish never exposes a
/// half-written value and never blocks them.
#[derive(Default)]
pub struct SnapshotCache {
    current: ArcSwapOption<Snapshot>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_snapshot(&self) -> Result<Arc<Snapshot>, QueryError> {
        self.current.load_full().ok_or(QueryError::CacheMiss)
    }

    /// Publishes `payload` unless its checksum matches the current snapshot.
    /// Only the refresh task calls this.
    pub fn publish_if_changed(&self, payload: SnapshotPayload) -> anyhow::Result<PublishOutcome> {
        let checksum = content_checksum(&payload)?;

        if let Some(current) = &*self.current.load() {
            if current.checksum == checksum {
                return Ok(PublishOutcome::Unchanged { checksum });
            }
        }

        self.current
            .store(Some(Arc::new(Snapshot::new(payload, checksum.clone()))));
        Ok(PublishOutcome::Published { checksum })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::UbpkMode;
    use crate::domain::snapshot::{DriverFocusedStats, SummaryTotals};

    fn payload(total_trips: u64) -> SnapshotPayload {
        SnapshotPayload {
            ubpk_mode: UbpkMode::SensorValidity,
            summary_totals: SummaryTotals {
                total_trips,
                ..SummaryTotals::default()
            },
            trip_metrics: Vec::new(),
            driver_focused_stats: DriverFocusedStats::default(),
            weekly_metrics: Vec::new(),
            improvement: Vec::new(),
        }
    }

    #[test]
    fn test_empty_cache_is_a_miss() {
        let cache = SnapshotCache::new();
        assert_eq!(cache.get_snapshot().unwrap_err(), QueryError::CacheMiss);
    }

    #[test]
    fn test_first_publish_populates_cache() {
        let cache = SnapshotCache::new();
        let outcome = cache.publish_if_changed(payload(3)).unwrap();
        let snapshot = cache.get_snapshot().unwrap();

        assert_eq!(
            outcome,
            PublishOutcome::Published {
                checksum: snapshot.checksum.clone()
            }
        );
        assert_eq!(snapshot.payload.summary_totals.total_trips, 3);
    }

    #[test]
    fn test_identical_payload_keeps_the_same_snapshot() {
        let cache = SnapshotCache::new();
        cache.publish_if_changed(payload(3)).unwrap();
        let before = cache.get_snapshot().unwrap();

        let outcome = cache.publish_if_changed(payload(3)).unwrap();
        let after = cache.get_snapshot().unwrap();

        assert!(matches!(outcome, PublishOutcome::Unchanged { .. }));
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_changed_payload_replaces_snapshot() {
        let cache = SnapshotCache::new();
        cache.publish_if_changed(payload(3)).unwrap();
        let before = cache.get_snapshot().unwrap();

        let outcome = cache.publish_if_changed(payload(4)).unwrap();
        let after = cache.get_snapshot().unwrap();

        assert!(matches!(outcome, PublishOutcome::Published { .. }));
        assert_ne!(before.checksum, after.checksum);
        // In-flight readers keep the old one intact
        assert_eq!(before.payload.summary_totals.total_trips, 3);
        assert_eq!(after.payload.summary_totals.total_trips, 4);
    }
}
