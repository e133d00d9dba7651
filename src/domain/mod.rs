// Domain layer - Entities, derived metrics and the published snapshot schema
pub mod errors;
pub mod fleet;
pub mod metrics;
pub mod snapshot;
pub mod week;
