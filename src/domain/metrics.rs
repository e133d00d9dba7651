// Derived metric rows - Per-trip, per-driver and per-week UBPK
use crate::domain::week::IsoWeek;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Which UBPK definition produced a set of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UbpkMode {
    /// invalid samples / total samples
    SensorValidity,
    /// detected unsafe events / distance in km
    EventRate,
}

/// Unsafe-behaviour numerator and exposure denominator. Ratios are summed
/// component-wise before dividing so that driver and week rollups weight each
/// trip by its exposure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UbpkRatio {
    pub unsafe_units: f64,
    pub exposure: f64,
}

impl UbpkRatio {
    pub fn new(unsafe_units: f64, exposure: f64) -> Self {
        Self {
            unsafe_units,
            exposure,
        }
    }

    /// Zero exposure yields zero rather than dividing.
    pub fn value(&self) -> f64 {
        if self.exposure > 0.0 {
            self.unsafe_units / self.exposure
        } else {
            0.0
        }
    }
}

impl AddAssign for UbpkRatio {
    fn add_assign(&mut self, rhs: Self) {
        self.unsafe_units += rhs.unsafe_units;
        self.exposure += rhs.exposure;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCounts {
    pub harsh_brakes: u32,
    pub rapid_accelerations: u32,
    pub speeding: u32,
    pub distance_km: f64,
}

impl EventCounts {
    pub fn total_events(&self) -> u32 {
        self.harsh_brakes + self.rapid_accelerations + self.speeding
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverResolution {
    Resolved,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripMetric {
    pub trip_id: String,
    pub driver_id: String,
    pub driver_email: Option<String>,
    pub driver_resolution: DriverResolution,
    pub start_time: Option<String>,
    pub iso_week: Option<IsoWeek>,
    pub total_sensor_data_count: u64,
    pub invalid_sensor_data_count: u64,
    pub valid_sensor_data_count: u64,
    pub events: Option<EventCounts>,
    pub ratio: UbpkRatio,
    pub ubpk: f64,
}

impl TripMetric {
    /// A trip with no sensor records has no UBPK to speak of. It still counts
    /// towards trip and driver totals but never feeds weekly or trend figures.
    pub fn is_measured(&self) -> bool {
        self.total_sensor_data_count > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverAggregate {
    pub driver_id: String,
    pub driver_email: Option<String>,
    pub driver_resolution: DriverResolution,
    pub num_trips: u64,
    pub valid_sensor_data_count: u64,
    pub invalid_sensor_data_count: u64,
    pub ratio: UbpkRatio,
    pub ubpk: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverWeeklyMetric {
    pub driver_id: String,
    pub week: IsoWeek,
    pub num_trips: u64,
    pub ratio: UbpkRatio,
    pub ubpk: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverImprovement {
    pub driver_id: String,
    pub observations: usize,
    pub improved: bool,
    pub t_statistic: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyHistoryPoint {
    pub week: IsoWeek,
    pub num_trips: u64,
    pub num_drivers: usize,
    pub ubpk: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverWeekPoint {
    pub week: IsoWeek,
    pub num_trips: u64,
    pub ubpk: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairedWeekComparison {
    pub week: IsoWeek,
    pub previous_week: IsoWeek,
    pub drivers_compared: usize,
    pub t_statistic: f64,
    pub p_value: f64,
    pub mean_difference: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_zero_exposure_is_zero() {
        assert_eq!(UbpkRatio::new(3.0, 0.0).value(), 0.0);
        assert_eq!(UbpkRatio::default().value(), 0.0);
    }

    #[test]
    fn test_ratio_sums_components() {
        let mut total = UbpkRatio::new(2.0, 10.0);
        total += UbpkRatio::new(1.0, 8.0);
        assert_eq!(total, UbpkRatio::new(3.0, 18.0));
        assert!((total.value() - 3.0 / 18.0).abs() < 1e-12);
    }

    #[test]
    fn test_mode_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&UbpkMode::SensorValidity).unwrap(),
            "\"sensor_validity\""
        );
        let mode: UbpkMode = serde_json::from_str("\"event_rate\"").unwrap();
        assert_eq!(mode, UbpkMode::EventRate);
    }
}
