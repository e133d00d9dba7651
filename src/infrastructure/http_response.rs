// HTTP response utilities for the JSON query surface
use crate::domain::errors::QueryError;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl QueryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            QueryError::CacheMiss => StatusCode::SERVICE_UNAVAILABLE,
            QueryError::InvalidWeek(_)
            | QueryError::InvalidParameter { .. }
            | QueryError::InsufficientData(_) => StatusCode::BAD_REQUEST,
            QueryError::NotFound(_) => StatusCode::NOT_FOUND,
            QueryError::UnsupportedSchema(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            QueryError::CacheMiss => "no_data",
            QueryError::InvalidWeek(_) => "invalid_week",
            QueryError::InvalidParameter { .. } => "invalid_parameter",
            QueryError::NotFound(_) => "not_found",
            QueryError::InsufficientData(_) => "insufficient_data",
            QueryError::UnsupportedSchema(_) => "unsupported_schema",
        }
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error = %self, "Query failed");
        }

        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        let mut response = (status, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::WeekParseError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (QueryError::CacheMiss, StatusCode::SERVICE_UNAVAILABLE),
            (
                QueryError::InvalidWeek(WeekParseError {
                    input: "2024-23".to_string(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                QueryError::InvalidParameter {
                    param: "weeks",
                    value: "abc".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                QueryError::InsufficientData("one driver".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (QueryError::NotFound("trip `x`".to_string()), StatusCode::NOT_FOUND),
            (QueryError::UnsupportedSchema(1), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), expected);
            assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        }
    }

    #[test]
    fn test_cache_miss_message() {
        assert_eq!(QueryError::CacheMiss.to_string(), "no data available yet");
        assert_eq!(QueryError::CacheMiss.kind(), "no_data");
    }
}
