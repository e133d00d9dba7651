// Snapshot schema - The single published result of a refresh cycle
use crate::domain::metrics::{
    DriverAggregate, DriverImprovement, DriverWeeklyMetric, TripMetric, UbpkMode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bumped whenever the payload shape changes. Readers go through
/// `SnapshotView`, which refuses versions it does not understand.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 2;

/// Per-collection counters from a fetch and validation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionHealth {
    pub fetched: u64,
    pub rejected: u64,
    pub truncated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTotals {
    pub total_driver_profiles: u64,
    pub total_trips: u64,
    pub total_sensor_records: u64,
    pub orphan_sensor_record_count: u64,
    pub global_invalid_sensor_count: u64,
    pub global_valid_sensor_count: u64,
    pub unresolved_driver_trip_count: u64,
    pub trips_without_driver_count: u64,
    pub driver_profiles: CollectionHealth,
    pub trips: CollectionHealth,
    pub sensor_samples: CollectionHealth,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverFocusedStats {
    pub driver_list: Vec<DriverAggregate>,
    pub total_num_trips: u64,
    pub total_valid_sensor_data: u64,
    pub total_invalid_sensor_data: u64,
}

/// Hashed content of a snapshot. Everything in here participates in the
/// checksum, so it must serialize deterministically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    pub ubpk_mode: UbpkMode,
    pub summary_totals: SummaryTotals,
    pub trip_metrics: Vec<TripMetric>,
    pub driver_focused_stats: DriverFocusedStats,
    pub weekly_metrics: Vec<DriverWeeklyMetric>,
    pub improvement: Vec<DriverImprovement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub schema_version: u32,
    pub captured_at: DateTime<Utc>,
    pub checksum: String,
    pub payload: SnapshotPayload,
}

impl Snapshot {
    pub fn new(payload: SnapshotPayload, checksum: String) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            captured_at: Utc::now(),
            checksum,
            payload,
        }
    }
}
