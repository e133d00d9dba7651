// Event detector - Unsafe driving events from an ordered speed stream
use crate::domain::metrics::EventCounts;

/// Speed drop between consecutive samples that counts as harsh braking.
pub const HARSH_BRAKE_DELTA: f64 = 4.0;
/// Speed gain between consecutive samples that counts as rapid acceleration.
pub const RAPID_ACCEL_DELTA: f64 = 4.0;
pub const SPEEDING_KMH: f64 = 100.0;

const MPS_TO_KMH: f64 = 3.6;
const METRES_PER_KM: f64 = 1000.0;

/// Scans speed samples (m/s, one per unit of time) for unsafe events.
///
/// Distance is rectangular integration with a unit interval: each speed
/// value is added as if it were metres travelled. This is an approximation
/// kept as-is; it is only correct when samples are one second apart.
///
/// Fewer than two samples produce no events, only the distance.
pub fn detect_events(speeds: &[f64]) -> EventCounts {
    let distance_km = speeds.iter().sum::<f64>() / METRES_PER_KM;
    if speeds.len() < 2 {
        return EventCounts {
            distance_km,
            ..EventCounts::default()
        };
    }

    let mut counts = EventCounts {
        distance_km,
        ..EventCounts::default()
    };

    for speed in speeds {
        if speed * MPS_TO_KMH > SPEEDING_KMH {
            counts.speeding += 1;
        }
    }

    for pair in speeds.windows(2) {
        let delta = pair[1] - pair[0];
        if delta <= -HARSH_BRAKE_DELTA {
            counts.harsh_brakes += 1;
        }
        if delta >= RAPID_ACCEL_DELTA {
            counts.rapid_accelerations += 1;
        }
    }

    counts
}
