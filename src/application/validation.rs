// Validator - Converts raw upstream records into typed fleet entities
use crate::domain::errors::Rejection;
use crate::domain::fleet::{Collection, DriverProfile, SensorSample, Trip};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Entities that can be built from a raw upstream record.
pub trait Validate: Sized {
    const COLLECTION: Collection;

    fn validate(raw: &Value) -> Result<Self, Rejection>;

    /// Identifier that must be unique within a batch, if any.
    fn identity(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBatch<T> {
    pub entities: Vec<T>,
    pub rejected: u64,
}

/// Validates every record in a batch. Rejected records are logged and
/// counted; they never stop the rest of the batch.
pub fn validate_batch<T: Validate>(records: &[Value]) -> ValidatedBatch<T> {
    let mut entities = Vec::with_capacity(records.len());
    let mut seen: HashSet<String> = HashSet::new();
    let mut rejected = 0u64;

    for raw in records {
        let outcome = T::validate(raw).and_then(|entity| {
            if let Some(id) = entity.identity() {
                if !seen.insert(id.to_string()) {
                    return Err(Rejection::DuplicateId(id.to_string()));
                }
            }
            Ok(entity)
        });

        match outcome {
            Ok(entity) => entities.push(entity),
            Err(reason) => {
                rejected += 1;
                tracing::warn!(
                    collection = T::COLLECTION.as_str(),
                    %reason,
                    payload = %raw,
                    "Rejected upstream record"
                );
            }
        }
    }

    ValidatedBatch { entities, rejected }
}

enum Field {
    Absent,
    Text(String),
    Unsupported,
}

/// Reads the first alias that carries a usable value. Strings are trimmed and
/// blank strings count as absent; integers are rendered in decimal.
fn read_field(obj: &Map<String, Value>, aliases: &[&str]) -> Field {
    let mut unsupported = false;
    for alias in aliases {
        match obj.get(*alias) {
            None | Some(Value::Null) => {}
            Some(Value::String(text)) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    return Field::Text(trimmed.to_string());
                }
            }
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => {
                return Field::Text(n.to_string());
            }
            Some(_) => unsupported = true,
        }
    }
    if unsupported {
        Field::Unsupported
    } else {
        Field::Absent
    }
}

fn required(
    obj: &Map<String, Value>,
    aliases: &[&str],
    field: &'static str,
) -> Result<String, Rejection> {
    match read_field(obj, aliases) {
        Field::Text(text) => Ok(text),
        Field::Absent => Err(Rejection::MissingField(field)),
        Field::Unsupported => Err(Rejection::InvalidType {
            field,
            expected: "string or integer",
        }),
    }
}

fn optional(obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    match read_field(obj, aliases) {
        Field::Text(text) => Some(text),
        Field::Absent | Field::Unsupported => None,
    }
}

fn as_object(raw: &Value) -> Result<&Map<String, Value>, Rejection> {
    raw.as_object().ok_or(Rejection::NotAnObject)
}

fn numeric_item(item: &Value) -> Option<f64> {
    match item {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Sensor values arrive either as a JSON array or as a JSON-encoded string
/// holding one. Non-numeric items are dropped one by one.
pub fn parse_sensor_values(raw: Option<&Value>) -> Result<Vec<f64>, Rejection> {
    let items = match raw {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => return Ok(items.iter().filter_map(numeric_item).collect()),
        Some(Value::String(encoded)) => {
            let encoded = encoded.trim();
            if encoded.is_empty() {
                return Ok(Vec::new());
            }
            match serde_json::from_str::<Value>(encoded) {
                Ok(Value::Array(items)) => items,
                Ok(other) => {
                    return Err(Rejection::MalformedValues(format!(
                        "expected an array, found {}",
                        other
                    )));
                }
                Err(e) => return Err(Rejection::MalformedValues(e.to_string())),
            }
        }
        Some(_) => {
            return Err(Rejection::InvalidType {
                field: "values",
                expected: "array or JSON-encoded array",
            });
        }
    };
    Ok(items.iter().filter_map(numeric_item).collect())
}

impl Validate for DriverProfile {
    const COLLECTION: Collection = Collection::DriverProfiles;

    fn validate(raw: &Value) -> Result<Self, Rejection> {
        let obj = as_object(raw)?;
        Ok(DriverProfile {
            id: required(obj, &["driverProfileId", "driver_profile_id", "id"], "driverProfileId")?,
            email: optional(obj, &["email"]),
        })
    }

    fn identity(&self) -> Option<&str> {
        Some(&self.id)
    }
}

impl Validate for Trip {
    const COLLECTION: Collection = Collection::Trips;

    fn validate(raw: &Value) -> Result<Self, Rejection> {
        let obj = as_object(raw)?;
        Ok(Trip {
            id: required(obj, &["id", "trip_id"], "id")?,
            driver_id: optional(obj, &["driverProfileId", "driver_profile_id"]),
            start_time: optional(obj, &["startTime", "start_time"]),
        })
    }

    fn identity(&self) -> Option<&str> {
        Some(&self.id)
    }
}

impl Validate for SensorSample {
    const COLLECTION: Collection = Collection::SensorSamples;

    fn validate(raw: &Value) -> Result<Self, Rejection> {
        let obj = as_object(raw)?;
        Ok(SensorSample {
            trip_id: optional(obj, &["trip_id", "tripId"]),
            values: parse_sensor_values(obj.get("values"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_driver_profile_trims_and_drops_blank_email() {
        let profile = DriverProfile::validate(&json!({
            "driverProfileId": "  d1 ",
            "email": "   "
        }))
        .unwrap();
        assert_eq!(profile.id, "d1");
        assert_eq!(profile.email, None);
    }

    #[test]
    fn test_trip_requires_non_blank_id() {
        let err = Trip::validate(&json!({"id": "   ", "driverProfileId": "d1"})).unwrap_err();
        assert_eq!(err, Rejection::MissingField("id"));

        let err = Trip::validate(&json!({"id": {"nested": true}})).unwrap_err();
        assert!(matches!(err, Rejection::InvalidType { field: "id", .. }));
    }

    #[test]
    fn test_trip_reads_field_aliases() {
        let trip = Trip::validate(&json!({
            "trip_id": 42,
            "driver_profile_id": "d9",
            "start_time": "2024-06-03T10:00:00"
        }))
        .unwrap();
        assert_eq!(trip.id, "42");
        assert_eq!(trip.driver_id.as_deref(), Some("d9"));
        assert_eq!(trip.start_time.as_deref(), Some("2024-06-03T10:00:00"));
    }

    #[test]
    fn test_blank_primary_alias_falls_through() {
        let trip = Trip::validate(&json!({"id": "", "trip_id": "t7"})).unwrap();
        assert_eq!(trip.id, "t7");
    }

    #[test]
    fn test_sensor_values_from_encoded_string() {
        let sample = SensorSample::validate(&json!({
            "trip_id": "t1",
            "values": "[0, 0, 0]"
        }))
        .unwrap();
        assert_eq!(sample.values, vec![0.0, 0.0, 0.0]);
        assert!(sample.is_invalid());
    }

    #[test]
    fn test_sensor_values_drop_non_numeric_items() {
        let values = parse_sensor_values(Some(&json!([1.5, "2.5", "abc", null, true, 3]))).unwrap();
        assert_eq!(values, vec![1.5, 2.5, 3.0]);
    }

    #[test]
    fn test_sensor_values_malformed_string_is_rejected() {
        let err = SensorSample::validate(&json!({"trip_id": "t1", "values": "[1, 2"})).unwrap_err();
        assert!(matches!(err, Rejection::MalformedValues(_)));

        let err = SensorSample::validate(&json!({"values": {"x": 1}})).unwrap_err();
        assert!(matches!(err, Rejection::InvalidType { field: "values", .. }));
    }

    #[test]
    fn test_sensor_without_trip_is_orphan_not_rejected() {
        let sample = SensorSample::validate(&json!({"trip_id": " ", "values": [1, 2, 3]})).unwrap();
        assert!(sample.trip_id.is_none());
    }

    #[test]
    fn test_batch_counts_rejections_and_duplicates() {
        let records = vec![
            json!({"id": "t1", "driverProfileId": "d1"}),
            json!("not an object"),
            json!({"id": "t2"}),
            json!({"id": "t1", "driverProfileId": "d2"}),
            json!({"driverProfileId": "d3"}),
        ];
        let batch: ValidatedBatch<Trip> = validate_batch(&records);
        let ids: Vec<&str> = batch.entities.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2"]);
        assert_eq!(batch.entities[0].driver_id.as_deref(), Some("d1"));
        assert_eq!(batch.rejected, 3);
    }
}
