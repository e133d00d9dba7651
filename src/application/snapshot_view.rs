// Snapshot view - Versioned read adapter between the cache and its readers
use crate::domain::errors::QueryError;
use crate::domain::metrics::{DriverAggregate, DriverWeeklyMetric, TripMetric};
use crate::domain::snapshot::{SNAPSHOT_SCHEMA_VERSION, Snapshot, SnapshotPayload};
use crate::domain::week::IsoWeek;
use std::sync::Arc;

/// A snapshot whose schema version has been checked. Query code only reads
/// through this type.
#[derive(Debug, Clone)]
pub struct SnapshotView {
    snapshot: Arc<Snapshot>,
}

impl SnapshotView {
    pub fn new(snapshot: Arc<Snapshot>) -> Result<Self, QueryError> {
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(QueryError::UnsupportedSchema(snapshot.schema_version));
        }
        Ok(Self { snapshot })
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    pub fn payload(&self) -> &SnapshotPayload {
        &self.snapshot.payload
    }

    pub fn trip(&self, trip_id: &str) -> Option<&TripMetric> {
        self.payload()
            .trip_metrics
            .iter()
            .find(|trip| trip.trip_id == trip_id)
    }

    pub fn driver(&self, driver_id: &str) -> Option<&DriverAggregate> {
        self.payload()
            .driver_focused_stats
            .driver_list
            .iter()
            .find(|driver| driver.driver_id == driver_id)
    }

    pub fn week_rows(&self, week: IsoWeek) -> impl Iterator<Item = &DriverWeeklyMetric> {
        self.payload()
            .weekly_metrics
            .iter()
            .filter(move |row| row.week == week)
    }

    pub fn driver_week(&self, driver_id: &str, week: IsoWeek) -> Option<&DriverWeeklyMetric> {
        self.week_rows(week).find(|row| row.driver_id == driver_id)
    }
}
