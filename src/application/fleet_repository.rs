// Repository trait for upstream fleet data access
use async_trait::async_trait;
use serde_json::Value;

/// Raw records retrieved from one upstream collection.
///
/// Implementations never fail outright: a transport or decoding error ends
/// the paging loop and whatever was accumulated is returned with
/// `truncated` set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedCollection {
    pub records: Vec<Value>,
    pub pages: usize,
    pub truncated: bool,
}

#[async_trait]
pub trait FleetRepository: Send + Sync {
    /// Fetch all driver profiles (single large request)
    async fn fetch_driver_profiles(&self) -> FetchedCollection;

    /// Fetch all trips (paged)
    async fn fetch_trips(&self) -> FetchedCollection;

    /// Fetch all raw sensor samples (paged)
    async fn fetch_sensor_samples(&self) -> FetchedCollection;
}
