// Application layer - Refresh pipeline, statistics and the query use cases
pub mod aggregation;
pub mod event_detection;
pub mod fleet_repository;
pub mod query_service;
pub mod refresh_service;
pub mod snapshot_cache;
pub mod snapshot_view;
pub mod statistics;
pub mod ubpk;
pub mod validation;
