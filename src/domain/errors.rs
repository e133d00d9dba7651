// Error taxonomy shared across the pipeline and the query surface
use thiserror::Error;

/// Why a raw upstream record was dropped during validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("required field `{0}` is missing or blank")]
    MissingField(&'static str),
    #[error("field `{field}` has an unsupported type (expected {expected})")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("sensor values could not be parsed: {0}")]
    MalformedValues(String),
    #[error("duplicate identifier `{0}`")]
    DuplicateId(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("insufficient samples: {reason}")]
    InsufficientSamples { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ISO week `{input}`, expected YYYY-Www")]
pub struct WeekParseError {
    pub input: String,
}

/// Conditions surfaced to query callers. None of these are fatal to the service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("no data available yet")]
    CacheMiss,
    #[error(transparent)]
    InvalidWeek(#[from] WeekParseError),
    #[error("invalid `{param}` value `{value}`")]
    InvalidParameter { param: &'static str, value: String },
    #[error("{0} not found")]
    NotFound(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("unsupported snapshot schema version {0}")]
    UnsupportedSchema(u32),
}

impl From<StatsError> for QueryError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::InsufficientSamples { reason } => QueryError::InsufficientData(reason),
        }
    }
}
