// Provider client - Paged HTTP fetcher for the upstream fleet API
use crate::application::fleet_repository::{FetchedCollection, FleetRepository};
use crate::domain::fleet::Collection;
use crate::infrastructure::config::ProviderSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: reqwest::Client,
    settings: ProviderSettings,
}

/// How a collection is requested.
#[derive(Debug, Clone, Copy)]
enum Paging {
    /// One request with a large `limit`.
    Single { limit: usize },
    /// `skip`/`limit` pages until an empty page comes back.
    Pages { page_size: usize },
}

impl ProviderClient {
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("Failed to build provider HTTP client")?;
        Ok(Self { client, settings })
    }

    async fn fetch_page(&self, url: &str, skip: usize, limit: usize) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(url)
            .query(&[("skip", skip), ("limit", limit)])
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to provider")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Provider request failed with status {}: {}", status, body);
        }

        response
            .json::<Vec<Value>>()
            .await
            .context("Failed to parse provider response")
    }

    /// Never fails: the first failed request ends the loop and the records
    /// gathered so far come back marked truncated.
    async fn fetch_collection(
        &self,
        collection: Collection,
        url: &str,
        paging: Paging,
    ) -> FetchedCollection {
        let mut fetched = FetchedCollection::default();
        let (page_size, single) = match paging {
            Paging::Single { limit } => (limit, true),
            Paging::Pages { page_size } => (page_size, false),
        };
        let mut skip = 0;

        loop {
            match self.fetch_page(url, skip, page_size).await {
                Ok(page) if page.is_empty() => break,
                Ok(page) => {
                    tracing::debug!(
                        collection = collection.as_str(),
                        skip,
                        records = page.len(),
                        "Fetched page"
                    );
                    fetched.pages += 1;
                    fetched.records.extend(page);
                    if single {
                        break;
                    }
                    skip += page_size;
                }
                Err(err) => {
                    tracing::error!(
                        collection = collection.as_str(),
                        endpoint = url,
                        skip,
                        error = ?err,
                        "Fetch failed, keeping records retrieved so far"
                    );
                    fetched.truncated = true;
                    break;
                }
            }
        }

        tracing::info!(
            collection = collection.as_str(),
            records = fetched.records.len(),
            pages = fetched.pages,
            truncated = fetched.truncated,
            "Fetched collection"
        );
        fetched
    }
}

#[async_trait]
impl FleetRepository for ProviderClient {
    async fn fetch_driver_profiles(&self) -> FetchedCollection {
        self.fetch_collection(
            Collection::DriverProfiles,
            &self.settings.driver_profiles_url,
            Paging::Single {
                limit: self.settings.driver_profile_limit,
            },
        )
        .await
    }

    async fn fetch_trips(&self) -> FetchedCollection {
        self.fetch_collection(
            Collection::Trips,
            &self.settings.trips_url,
            Paging::Pages {
                page_size: self.settings.trip_page_size,
            },
        )
        .await
    }

    async fn fetch_sensor_samples(&self) -> FetchedCollection {
        self.fetch_collection(
            Collection::SensorSamples,
            &self.settings.sensor_samples_url,
            Paging::Pages {
                page_size: self.settings.sensor_page_size,
            },
        )
        .await
    }
}
