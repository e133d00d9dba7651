// Infrastructure layer - External dependencies and adapters
pub mod checksum;
pub mod config;
pub mod http_response;
pub mod provider_client;
