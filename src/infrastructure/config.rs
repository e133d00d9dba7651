use crate::domain::metrics::UbpkMode;
use anyhow::{Context, ensure};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    pub refresh: RefreshSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderSettings {
    pub driver_profiles_url: String,
    pub trips_url: String,
    pub sensor_samples_url: String,
    pub driver_profile_limit: usize,
    pub trip_page_size: usize,
    pub sensor_page_size: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshSettings {
    pub interval_secs: u64,
    pub ubpk_mode: UbpkMode,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        self.bind_address
            .parse()
            .with_context(|| format!("Invalid server.bind_address `{}`", self.bind_address))
    }
}

impl ProviderSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl RefreshSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl AppConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server.socket_addr()?;
        ensure!(self.provider.driver_profile_limit > 0, "provider.driver_profile_limit must be positive");
        ensure!(self.provider.trip_page_size > 0, "provider.trip_page_size must be positive");
        ensure!(self.provider.sensor_page_size > 0, "provider.sensor_page_size must be positive");
        ensure!(self.provider.request_timeout_secs > 0, "provider.request_timeout_secs must be positive");
        ensure!(self.refresh.interval_secs > 0, "refresh.interval_secs must be positive");
        Ok(())
    }
}

fn defaults() -> anyhow::Result<ConfigBuilder<DefaultState>> {
    Ok(Config::builder()
        .set_default("server.bind_address", "0.0.0.0:8080")?
        .set_default(
            "provider.driver_profiles_url",
            "https://api.safedriveafrica.com/api/driver_profiles/",
        )?
        .set_default("provider.trips_url", "https://api.safedriveafrica.com/api/trips/")?
        .set_default(
            "provider.sensor_samples_url",
            "https://api.safedriveafrica.com/api/raw_sensor_data/",
        )?
        .set_default("provider.driver_profile_limit", 999_999_i64)?
        .set_default("provider.trip_page_size", 5_000_i64)?
        .set_default("provider.sensor_page_size", 10_000_i64)?
        .set_default("provider.request_timeout_secs", 30_i64)?
        .set_default("refresh.interval_secs", 10_i64)?
        .set_default("refresh.ubpk_mode", "sensor_validity")?)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<AppConfig> {
    let config: AppConfig = builder
        .build()?
        .try_deserialize()
        .context("Failed to read configuration")?;
    config.validate()?;
    Ok(config)
}

/// Built-in defaults, then `config/fleet.toml` if present, then `FLEET__*`
/// environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    finish(
        defaults()?
            .add_source(File::with_name("config/fleet").required(false))
            .add_source(
                Environment::with_prefix("FLEET")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            ),
    )
}
