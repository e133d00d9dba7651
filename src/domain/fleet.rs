// Fleet entities - Validated records produced from upstream payloads

#[derive(Debug, Clone, PartialEq)]
pub struct DriverProfile {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub id: String,
    pub driver_id: Option<String>,
    pub start_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorSample {
    pub trip_id: Option<String>,
    pub values: Vec<f64>,
}

impl SensorSample {
    /// All-zero x/y/z is a sensor fault signature. Samples carrying fewer than
    /// three coordinates are never flagged.
    pub fn is_invalid(&self) -> bool {
        self.values.len() >= 3 && self.values[..3].iter().all(|v| *v == 0.0)
    }
}

/// The three upstream collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    DriverProfiles,
    Trips,
    SensorSamples,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::DriverProfiles => "driver_profiles",
            Collection::Trips => "trips",
            Collection::SensorSamples => "sensor_samples",
        }
    }
}
