// HTTP request handlers
use crate::application::query_service::{WeekMetrics, resolve_week};
use crate::domain::errors::QueryError;
use crate::domain::metrics::{
    DriverImprovement, DriverWeekPoint, DriverWeeklyMetric, PairedWeekComparison, TripMetric,
    WeeklyHistoryPoint,
};
use crate::domain::snapshot::{DriverFocusedStats, Snapshot, SummaryTotals};
use crate::domain::week::IsoWeek;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_HISTORY_WEEKS: usize = 8;

type JsonResult<T> = Result<Json<T>, QueryError>;

#[derive(Debug, Default, Deserialize)]
pub struct WeekQuery {
    pub week: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Kept as text so a bad value gets the same JSON error as a bad week
    pub weeks: Option<String>,
    /// Last week of the window, defaults to the current week
    pub ending: Option<String>,
}

impl HistoryQuery {
    fn window(&self) -> Result<(usize, Option<IsoWeek>), QueryError> {
        let ending = match self.ending.as_deref() {
            Some(label) => Some(resolve_week(Some(label))?),
            None => None,
        };
        let weeks = match self.weeks.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_HISTORY_WEEKS,
            Some(raw) => raw.parse::<usize>().map_err(|_| QueryError::InvalidParameter {
                param: "weeks",
                value: raw.to_string(),
            })?,
        };
        Ok((weeks, ending))
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> JsonResult<Arc<Snapshot>> {
    state.query_service.snapshot().map(Json)
}

pub async fn get_summary(State(state): State<Arc<AppState>>) -> JsonResult<SummaryTotals> {
    state.query_service.summary().map(Json)
}

pub async fn list_trip_metrics(State(state): State<Arc<AppState>>) -> JsonResult<Vec<TripMetric>> {
    state.query_service.trip_metrics().map(Json)
}

pub async fn get_trip_metric(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
) -> JsonResult<TripMetric> {
    state.query_service.trip_metric(&trip_id).map(Json)
}

pub async fn get_driver_aggregates(
    State(state): State<Arc<AppState>>,
) -> JsonResult<DriverFocusedStats> {
    state.query_service.driver_aggregates().map(Json)
}

/// Per-driver rows for `?week=YYYY-Www`, or the current week
pub async fn get_weekly_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WeekQuery>,
) -> JsonResult<WeekMetrics> {
    let week = resolve_week(query.week.as_deref())?;
    state.query_service.weekly_metrics(week).map(Json)
}

pub async fn get_weekly_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> JsonResult<Vec<WeeklyHistoryPoint>> {
    let (weeks, ending) = query.window()?;
    state.query_service.weekly_history(weeks, ending).map(Json)
}

pub async fn get_week_improvement(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WeekQuery>,
) -> JsonResult<PairedWeekComparison> {
    let week = resolve_week(query.week.as_deref())?;
    state.query_service.paired_week_improvement(week).map(Json)
}

pub async fn list_driver_improvement(
    State(state): State<Arc<AppState>>,
) -> JsonResult<Vec<DriverImprovement>> {
    state.query_service.driver_improvement().map(Json)
}

pub async fn get_driver_week(
    State(state): State<Arc<AppState>>,
    Path((driver_id, week)): Path<(String, String)>,
) -> JsonResult<DriverWeeklyMetric> {
    let week: IsoWeek = week.parse()?;
    state.query_service.driver_week_metric(&driver_id, week).map(Json)
}

pub async fn get_driver_history(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> JsonResult<Vec<DriverWeekPoint>> {
    let (weeks, ending) = query.window()?;
    state
        .query_service
        .driver_history(&driver_id, weeks, ending)
        .map(Json)
}
