// Aggregator - Rolls sensor samples up to trip, driver and ISO-week metrics
use crate::application::ubpk::UbpkStrategy;
use crate::domain::fleet::{DriverProfile, SensorSample, Trip};
use crate::domain::metrics::{
    DriverAggregate, DriverResolution, DriverWeeklyMetric, TripMetric, UbpkRatio,
};
use crate::domain::week::IsoWeek;
use std::collections::{BTreeMap, HashMap};

/// Sample-level counters gathered while building trip rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleTotals {
    pub orphan: u64,
    pub invalid: u64,
    pub valid: u64,
    pub unresolved_driver_trips: u64,
    pub trips_without_driver: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub trip_rows: Vec<TripMetric>,
    pub driver_rows: Vec<DriverAggregate>,
    pub week_rows: Vec<DriverWeeklyMetric>,
    pub totals: SampleTotals,
}

/// Builds all three views from one validated set. Every view is sorted by
/// driver id and then by trip id or week, so identical input always yields
/// identical output regardless of upstream ordering.
pub fn aggregate(
    drivers: &[DriverProfile],
    trips: &[Trip],
    samples: &[SensorSample],
    strategy: &dyn UbpkStrategy,
) -> Aggregation {
    let (trip_rows, totals) = trip_metrics(drivers, trips, samples, strategy);
    let driver_rows = driver_rollup(drivers, &trip_rows);
    let week_rows = weekly_rollup(&trip_rows);

    Aggregation {
        trip_rows,
        driver_rows,
        week_rows,
        totals,
    }
}

/// One row per trip that has a driver id. Drivers missing from the profile
/// list are kept and marked unresolved.
pub fn trip_metrics(
    drivers: &[DriverProfile],
    trips: &[Trip],
    samples: &[SensorSample],
    strategy: &dyn UbpkStrategy,
) -> (Vec<TripMetric>, SampleTotals) {
    let emails: HashMap<&str, Option<&str>> = drivers
        .iter()
        .map(|d| (d.id.as_str(), d.email.as_deref()))
        .collect();

    let mut totals = SampleTotals::default();
    let mut by_trip: HashMap<&str, Vec<&SensorSample>> = HashMap::new();

    for sample in samples {
        let Some(trip_id) = sample.trip_id.as_deref() else {
            totals.orphan += 1;
            continue;
        };
        if sample.is_invalid() {
            totals.invalid += 1;
        } else {
            totals.valid += 1;
        }
        by_trip.entry(trip_id).or_default().push(sample);
    }

    let mut rows = Vec::with_capacity(trips.len());
    for trip in trips {
        let Some(driver_id) = trip.driver_id.as_deref() else {
            totals.trips_without_driver += 1;
            tracing::debug!(trip_id = %trip.id, "Skipping trip without a driver id");
            continue;
        };

        let (driver_email, driver_resolution) = match emails.get(driver_id) {
            Some(email) => (email.map(str::to_string), DriverResolution::Resolved),
            None => {
                totals.unresolved_driver_trips += 1;
                (None, DriverResolution::Unresolved)
            }
        };

        let trip_samples: &[&SensorSample] = by_trip
            .get(trip.id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let total = trip_samples.len() as u64;
        let invalid = trip_samples.iter().filter(|s| s.is_invalid()).count() as u64;
        let score = strategy.score_trip(trip_samples);

        rows.push(TripMetric {
            trip_id: trip.id.clone(),
            driver_id: driver_id.to_string(),
            driver_email,
            driver_resolution,
            start_time: trip.start_time.clone(),
            iso_week: trip.start_time.as_deref().and_then(IsoWeek::from_timestamp),
            total_sensor_data_count: total,
            invalid_sensor_data_count: invalid,
            valid_sensor_data_count: total - invalid,
            events: score.events,
            ratio: score.ratio,
            ubpk: score.ratio.value(),
        });
    }

    rows.sort_by(|a, b| {
        a.driver_id
            .cmp(&b.driver_id)
            .then_with(|| a.trip_id.cmp(&b.trip_id))
    });

    (rows, totals)
}

fn empty_driver_row(
    driver_id: &str,
    driver_email: Option<String>,
    driver_resolution: DriverResolution,
) -> DriverAggregate {
    DriverAggregate {
        driver_id: driver_id.to_string(),
        driver_email,
        driver_resolution,
        num_trips: 0,
        valid_sensor_data_count: 0,
        invalid_sensor_data_count: 0,
        ratio: UbpkRatio::default(),
        ubpk: 0.0,
    }
}

/// Every profiled driver appears, with zero stats when they have no trips.
pub fn driver_rollup(drivers: &[DriverProfile], trip_rows: &[TripMetric]) -> Vec<DriverAggregate> {
    let mut rows: BTreeMap<&str, DriverAggregate> = BTreeMap::new();

    for driver in drivers {
        rows.insert(
            driver.id.as_str(),
            empty_driver_row(&driver.id, driver.email.clone(), DriverResolution::Resolved),
        );
    }

    for trip in trip_rows {
        let row = rows.entry(trip.driver_id.as_str()).or_insert_with(|| {
            empty_driver_row(
                &trip.driver_id,
                trip.driver_email.clone(),
                trip.driver_resolution,
            )
        });
        row.num_trips += 1;
        row.valid_sensor_data_count += trip.valid_sensor_data_count;
        row.invalid_sensor_data_count += trip.invalid_sensor_data_count;
        row.ratio += trip.ratio;
    }

    rows.into_values()
        .map(|mut row| {
            row.ubpk = row.ratio.value();
            row
        })
        .collect()
}

/// Buckets trips by driver and ISO week. Trips without a parsable start time
/// or without sensor records are left out here but stay in the trip and
/// driver views.
pub fn weekly_rollup(trip_rows: &[TripMetric]) -> Vec<DriverWeeklyMetric> {
    let mut buckets: BTreeMap<(&str, IsoWeek), (u64, UbpkRatio)> = BTreeMap::new();

    for trip in trip_rows.iter().filter(|trip| trip.is_measured()) {
        let Some(week) = trip.iso_week else {
            continue;
        };
        let bucket = buckets.entry((trip.driver_id.as_str(), week)).or_default();
        bucket.0 += 1;
        bucket.1 += trip.ratio;
    }

    buckets
        .into_iter()
        .map(|((driver_id, week), (num_trips, ratio))| DriverWeeklyMetric {
            driver_id: driver_id.to_string(),
            week,
            num_trips,
            ratio,
            ubpk: ratio.value(),
        })
        .collect()
}
