// Query service - Read-only accessors over the published snapshot
use crate::application::snapshot_cache::SnapshotCache;
use crate::application::snapshot_view::SnapshotView;
use crate::application::statistics::paired_t_test;
use crate::domain::errors::QueryError;
use crate::domain::metrics::{
    DriverImprovement, DriverWeekPoint, DriverWeeklyMetric, PairedWeekComparison, TripMetric,
    UbpkRatio, WeeklyHistoryPoint,
};
use crate::domain::snapshot::{DriverFocusedStats, Snapshot, SummaryTotals};
use crate::domain::week::IsoWeek;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Longest history window served, about five years.
pub const MAX_HISTORY_WEEKS: usize = 260;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekMetrics {
    pub week: IsoWeek,
    pub drivers: Vec<DriverWeeklyMetric>,
}

#[derive(Clone)]
pub struct QueryService {
    cache: Arc<SnapshotCache>,
}

/// Parses an optional `YYYY-Www` label, falling back to the current week.
pub fn resolve_week(raw: Option<&str>) -> Result<IsoWeek, QueryError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(label) => Ok(label.parse()?),
        None => Ok(IsoWeek::current()),
    }
}

fn history_window(ending: Option<IsoWeek>, weeks: usize) -> Vec<IsoWeek> {
    ending
        .unwrap_or_else(IsoWeek::current)
        .trailing(weeks.clamp(1, MAX_HISTORY_WEEKS))
}

impl QueryService {
    pub fn new(cache: Arc<SnapshotCache>) -> Self {
        Self { cache }
    }

    fn view(&self) -> Result<SnapshotView, QueryError> {
        SnapshotView::new(self.cache.get_snapshot()?)
    }

    pub fn snapshot(&self) -> Result<Arc<Snapshot>, QueryError> {
        Ok(self.view()?.snapshot().clone())
    }

    pub fn summary(&self) -> Result<SummaryTotals, QueryError> {
        Ok(self.view()?.payload().summary_totals.clone())
    }

    pub fn trip_metrics(&self) -> Result<Vec<TripMetric>, QueryError> {
        Ok(self.view()?.payload().trip_metrics.clone())
    }

    pub fn trip_metric(&self, trip_id: &str) -> Result<TripMetric, QueryError> {
        self.view()?
            .trip(trip_id)
            .cloned()
            .ok_or_else(|| QueryError::NotFound(format!("trip `{trip_id}`")))
    }

    pub fn driver_aggregates(&self) -> Result<DriverFocusedStats, QueryError> {
        Ok(self.view()?.payload().driver_focused_stats.clone())
    }

    /// Every driver row for `week`. A week with no trips is an empty list.
    pub fn weekly_metrics(&self, week: IsoWeek) -> Result<WeekMetrics, QueryError> {
        let view = self.view()?;
        Ok(WeekMetrics {
            week,
            drivers: view.week_rows(week).cloned().collect(),
        })
    }

    pub fn driver_week_metric(
        &self,
        driver_id: &str,
        week: IsoWeek,
    ) -> Result<DriverWeeklyMetric, QueryError> {
        self.view()?
            .driver_week(driver_id, week)
            .cloned()
            .ok_or_else(|| QueryError::NotFound(format!("driver `{driver_id}` in week {week}")))
    }

    /// Fleet-wide UBPK for the `weeks` weeks ending at `ending`, oldest first.
    pub fn weekly_history(
        &self,
        weeks: usize,
        ending: Option<IsoWeek>,
    ) -> Result<Vec<WeeklyHistoryPoint>, QueryError> {
        let view = self.view()?;
        Ok(history_window(ending, weeks)
            .into_iter()
            .map(|week| {
                let mut num_trips = 0;
                let mut num_drivers = 0;
                let mut ratio = UbpkRatio::default();
                for row in view.week_rows(week) {
                    num_trips += row.num_trips;
                    num_drivers += 1;
                    ratio += row.ratio;
                }
                WeeklyHistoryPoint {
                    week,
                    num_trips,
                    num_drivers,
                    ubpk: ratio.value(),
                }
            })
            .collect())
    }

    /// Paired test of weekly UBPK between `week` and the week before it, over
    /// drivers active in both.
    pub fn paired_week_improvement(&self, week: IsoWeek) -> Result<PairedWeekComparison, QueryError> {
        let view = self.view()?;
        let previous_week = week.previous();

        let previous: BTreeMap<&str, f64> = view
            .week_rows(previous_week)
            .map(|row| (row.driver_id.as_str(), row.ubpk))
            .collect();
        let mut current_values = Vec::new();
        let mut previous_values = Vec::new();
        for row in view.week_rows(week) {
            if let Some(before) = previous.get(row.driver_id.as_str()) {
                current_values.push(row.ubpk);
                previous_values.push(*before);
            }
        }

        if current_values.len() < 2 {
            return Err(QueryError::InsufficientData(format!(
                "{} driver(s) active in both {previous_week} and {week}, need at least 2",
                current_values.len()
            )));
        }

        let test = paired_t_test(&current_values, &previous_values)?;
        Ok(PairedWeekComparison {
            week,
            previous_week,
            drivers_compared: current_values.len(),
            t_statistic: test.t_statistic,
            p_value: test.p_value,
            mean_difference: test.mean_difference,
        })
    }

    /// Week-over-week history for one driver. Weeks without trips have no UBPK.
    pub fn driver_history(
        &self,
        driver_id: &str,
        weeks: usize,
        ending: Option<IsoWeek>,
    ) -> Result<Vec<DriverWeekPoint>, QueryError> {
        let view = self.view()?;
        if view.driver(driver_id).is_none() {
            return Err(QueryError::NotFound(format!("driver `{driver_id}`")));
        }

        Ok(history_window(ending, weeks)
            .into_iter()
            .map(|week| match view.driver_week(driver_id, week) {
                Some(row) => DriverWeekPoint {
                    week,
                    num_trips: row.num_trips,
                    ubpk: Some(row.ubpk),
                },
                None => DriverWeekPoint {
                    week,
                    num_trips: 0,
                    ubpk: None,
                },
            })
            .collect())
    }

    pub fn driver_improvement(&self) -> Result<Vec<DriverImprovement>, QueryError> {
        Ok(self.view()?.payload().improvement.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::refresh_service::tests::fixture_service;

    fn week(label: &str) -> IsoWeek {
        label.parse().unwrap()
    }

    async fn populated() -> QueryService {
        let cache = Arc::new(SnapshotCache::new());
        fixture_service().run_cycle(&cache).await.unwrap();
        QueryService::new(cache)
    }

    #[test]
    fn test_empty_cache_reports_no_data() {
        let service = QueryService::new(Arc::new(SnapshotCache::new()));
        assert_eq!(service.snapshot().unwrap_err(), QueryError::CacheMiss);
        assert_eq!(service.summary().unwrap_err(), QueryError::CacheMiss);
        assert_eq!(
            service.weekly_history(4, Some(week("2024-W23"))).unwrap_err(),
            QueryError::CacheMiss
        );
    }

    #[test]
    fn test_resolve_week() {
        assert_eq!(resolve_week(Some("2024-W23")).unwrap(), week("2024-W23"));
        assert_eq!(resolve_week(None).unwrap(), IsoWeek::current());
        assert_eq!(resolve_week(Some("  ")).unwrap(), IsoWeek::current());
        assert!(matches!(
            resolve_week(Some("2024-23")),
            Err(QueryError::InvalidWeek(_))
        ));
    }

    #[tokio::test]
    async fn test_trip_lookup() {
        let service = populated().await;
        let t1 = service.trip_metric("t1").unwrap();
        assert!((t1.ubpk - 0.2).abs() < 1e-12);
        assert!(matches!(
            service.trip_metric("missing"),
            Err(QueryError::NotFound(_))
        ));
        assert_eq!(service.trip_metrics().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_driver_week_lookup() {
        let service = populated().await;
        let row = service.driver_week_metric("d1", week("2024-W23")).unwrap();
        assert_eq!(row.num_trips, 1);
        assert!((row.ubpk - 0.2).abs() < 1e-12);

        assert!(matches!(
            service.driver_week_metric("d1", week("2024-W30")),
            Err(QueryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_weekly_metrics_for_week() {
        let service = populated().await;
        let w23 = service.weekly_metrics(week("2024-W23")).unwrap();
        assert_eq!(w23.drivers.len(), 2);
        assert!((w23.drivers[1].ubpk - 0.5).abs() < 1e-12);

        let quiet = service.weekly_metrics(week("2024-W40")).unwrap();
        assert!(quiet.drivers.is_empty());
    }

    #[tokio::test]
    async fn test_weekly_history_fills_quiet_weeks() {
        let service = populated().await;
        let history = service.weekly_history(3, Some(week("2024-W23"))).unwrap();
        let labels: Vec<String> = history.iter().map(|p| p.week.to_string()).collect();
        assert_eq!(labels, vec!["2024-W21", "2024-W22", "2024-W23"]);

        assert_eq!(history[0].num_trips, 0);
        assert_eq!(history[0].ubpk, 0.0);

        // W23: (2 + 3) / (10 + 6)
        assert_eq!(history[2].num_trips, 2);
        assert_eq!(history[2].num_drivers, 2);
        assert!((history[2].ubpk - 5.0 / 16.0).abs() < 1e-12);

        let clamped = service.weekly_history(0, Some(week("2024-W23"))).unwrap();
        assert_eq!(clamped.len(), 1);
    }

    #[tokio::test]
    async fn test_paired_week_improvement() {
        let service = populated().await;
        // d1: 0.2 vs 0.125, d2: 0.5 vs 0.0
        let result = service.paired_week_improvement(week("2024-W23")).unwrap();
        assert_eq!(result.previous_week, week("2024-W22"));
        assert_eq!(result.drivers_compared, 2);
        assert!((result.mean_difference - 0.2875).abs() < 1e-12);
        assert!((result.t_statistic - 0.2875 / 0.2125).abs() < 1e-9);

        assert!(matches!(
            service.paired_week_improvement(week("2024-W22")),
            Err(QueryError::InsufficientData(_))
        ));
    }

    #[tokio::test]
    async fn test_driver_history() {
        let service = populated().await;
        let history = service
            .driver_history("d2", 3, Some(week("2024-W23")))
            .unwrap();
        assert_eq!(history[0].ubpk, None);
        assert_eq!(history[1].ubpk, Some(0.0));
        assert_eq!(history[1].num_trips, 1);
        assert_eq!(history[2].ubpk, Some(0.5));

        assert!(matches!(
            service.driver_history("nobody", 3, None),
            Err(QueryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_improvement_and_aggregates_come_from_snapshot() {
        let service = populated().await;
        let improvement = service.driver_improvement().unwrap();
        assert_eq!(improvement.len(), 2);
        assert!(improvement.iter().all(|i| !i.improved && i.observations == 2));

        let stats = service.driver_aggregates().unwrap();
        assert_eq!(stats.total_num_trips, 4);
        assert_eq!(service.summary().unwrap().total_trips, 4);
    }
}
