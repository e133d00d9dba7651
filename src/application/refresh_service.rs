// Refresh service - Fetch, validate, aggregate and publish on a fixed interval
use crate::application::aggregation::aggregate;
use crate::application::fleet_repository::{FetchedCollection, FleetRepository};
use crate::application::snapshot_cache::{PublishOutcome, SnapshotCache};
use crate::application::statistics::improvement_analysis;
use crate::application::ubpk::UbpkStrategy;
use crate::application::validation::{ValidatedBatch, validate_batch};
use crate::domain::fleet::{DriverProfile, SensorSample, Trip};
use crate::domain::snapshot::{CollectionHealth, DriverFocusedStats, SnapshotPayload, SummaryTotals};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct RefreshService {
    repository: Arc<dyn FleetRepository>,
    strategy: Arc<dyn UbpkStrategy>,
}

fn health<T>(fetched: &FetchedCollection, batch: &ValidatedBatch<T>) -> CollectionHealth {
    CollectionHealth {
        fetched: fetched.records.len() as u64,
        rejected: batch.rejected,
        truncated: fetched.truncated,
    }
}

impl RefreshService {
    pub fn new(repository: Arc<dyn FleetRepository>, strategy: Arc<dyn UbpkStrategy>) -> Self {
        Self {
            repository,
            strategy,
        }
    }

    /// Builds a candidate payload from scratch. Nothing from a previous cycle
    /// is reused.
    pub async fn build_payload(&self) -> SnapshotPayload {
        // Fan out; a failing collection comes back truncated, never cancels the others
        let (profiles_raw, trips_raw, samples_raw) = tokio::join!(
            self.repository.fetch_driver_profiles(),
            self.repository.fetch_trips(),
            self.repository.fetch_sensor_samples(),
        );

        let profiles: ValidatedBatch<DriverProfile> = validate_batch(&profiles_raw.records);
        let trips: ValidatedBatch<Trip> = validate_batch(&trips_raw.records);
        let samples: ValidatedBatch<SensorSample> = validate_batch(&samples_raw.records);

        let aggregation = aggregate(
            &profiles.entities,
            &trips.entities,
            &samples.entities,
            self.strategy.as_ref(),
        );
        let improvement = improvement_analysis(
            aggregation.driver_rows.iter().map(|row| row.driver_id.as_str()),
            &aggregation.trip_rows,
        );

        let summary_totals = SummaryTotals {
            total_driver_profiles: profiles.entities.len() as u64,
            total_trips: trips.entities.len() as u64,
            total_sensor_records: samples.entities.len() as u64,
            orphan_sensor_record_count: aggregation.totals.orphan,
            global_invalid_sensor_count: aggregation.totals.invalid,
            global_valid_sensor_count: aggregation.totals.valid,
            unresolved_driver_trip_count: aggregation.totals.unresolved_driver_trips,
            trips_without_driver_count: aggregation.totals.trips_without_driver,
            driver_profiles: health(&profiles_raw, &profiles),
            trips: health(&trips_raw, &trips),
            sensor_samples: health(&samples_raw, &samples),
        };

        let driver_focused_stats = DriverFocusedStats {
            total_num_trips: aggregation.driver_rows.iter().map(|r| r.num_trips).sum(),
            total_valid_sensor_data: aggregation
                .driver_rows
                .iter()
                .map(|r| r.valid_sensor_data_count)
                .sum(),
            total_invalid_sensor_data: aggregation
                .driver_rows
                .iter()
                .map(|r| r.invalid_sensor_data_count)
                .sum(),
            driver_list: aggregation.driver_rows,
        };

        SnapshotPayload {
            ubpk_mode: self.strategy.mode(),
            summary_totals,
            trip_metrics: aggregation.trip_rows,
            driver_focused_stats,
            weekly_metrics: aggregation.week_rows,
            improvement,
        }
    }

    pub async fn run_cycle(&self, cache: &SnapshotCache) -> anyhow::Result<PublishOutcome> {
        let started = Instant::now();
        let payload = self.build_payload().await;
        let trips = payload.trip_metrics.len();
        let outcome = cache.publish_if_changed(payload)?;

        match &outcome {
            PublishOutcome::Published { checksum } => tracing::info!(
                %checksum,
                trips,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Published new snapshot"
            ),
            PublishOutcome::Unchanged { checksum } => tracing::info!(
                %checksum,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Snapshot unchanged"
            ),
        }

        Ok(outcome)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Runs refresh cycles forever, sleeping `interval` between them. A cycle that
/// errors or panics only costs that cycle. Aborting the returned handle also
/// cancels a cycle in progress.
pub fn spawn_refresh_loop(
    service: RefreshService,
    cache: Arc<SnapshotCache>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let cycle = AssertUnwindSafe(service.run_cycle(&cache))
                .catch_unwind()
                .await;

            match cycle {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    tracing::error!(error = ?err, "Refresh cycle failed, keeping previous snapshot");
                }
                Err(payload) => {
                    tracing::error!(
                        panic = panic_message(payload.as_ref()),
                        "Refresh cycle panicked, keeping previous snapshot"
                    );
                }
            }

            tokio::time::sleep(interval).await;
        }
    })
}
