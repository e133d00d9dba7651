// UBPK strategies - Pluggable definitions of unsafe behaviour per kilometre
use crate::application::event_detection::detect_events;
use crate::domain::fleet::SensorSample;
use crate::domain::metrics::{EventCounts, UbpkMode, UbpkRatio};
use std::sync::Arc;

/// Score of one trip under a UBPK definition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripScore {
    pub ratio: UbpkRatio,
    pub events: Option<EventCounts>,
}

/// A UBPK definition. The aggregator only sees the numerator/denominator
/// pair, so rollups are identical whichever definition is active.
pub trait UbpkStrategy: Send + Sync {
    fn mode(&self) -> UbpkMode;

    /// `samples` are the trip's sensor records in upstream order.
    fn score_trip(&self, samples: &[&SensorSample]) -> TripScore;
}

/// invalid samples / total samples
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorValidityUbpk;

impl UbpkStrategy for SensorValidityUbpk {
    fn mode(&self) -> UbpkMode {
        UbpkMode::SensorValidity
    }

    fn score_trip(&self, samples: &[&SensorSample]) -> TripScore {
        let invalid = samples.iter().filter(|s| s.is_invalid()).count();
        TripScore {
            ratio: UbpkRatio::new(invalid as f64, samples.len() as f64),
            events: None,
        }
    }
}

/// (harsh brakes + rapid accelerations + speeding) / distance in km.
/// Every value of every sample is read as a speed, in upstream order.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventRateUbpk;

impl UbpkStrategy for EventRateUbpk {
    fn mode(&self) -> UbpkMode {
        UbpkMode::EventRate
    }

    fn score_trip(&self, samples: &[&SensorSample]) -> TripScore {
        let speeds: Vec<f64> = samples
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .collect();
        let events = detect_events(&speeds);
        TripScore {
            ratio: UbpkRatio::new(events.total_events() as f64, events.distance_km),
            events: Some(events),
        }
    }
}

pub fn strategy_for(mode: UbpkMode) -> Arc<dyn UbpkStrategy> {
    match mode {
        UbpkMode::SensorValidity => Arc::new(SensorValidityUbpk),
        UbpkMode::EventRate => Arc::new(EventRateUbpk),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(values: &[f64]) -> SensorSample {
        SensorSample {
            trip_id: Some("t1".to_string()),
            values: values.to_vec(),
        }
    }

    #[test]
    fn test_sensor_validity_ratio() {
        let samples = [
            sample(&[0.0, 0.0, 0.0]),
            sample(&[1.0, 2.0, 3.0]),
            sample(&[0.0, 0.0, 0.0]),
            sample(&[0.5, 0.0, 0.0]),
        ];
        let refs: Vec<&SensorSample> = samples.iter().collect();
        let score = SensorValidityUbpk.score_trip(&refs);
        assert_eq!(score.ratio, UbpkRatio::new(2.0, 4.0));
        assert_eq!(score.ratio.value(), 0.5);
        assert!(score.events.is_none());
    }

    #[test]
    fn test_event_rate_concatenates_sample_values() {
        // 10 -> 20 is a rapid acceleration across sample boundaries
        let samples = [sample(&[10.0]), sample(&[20.0, 20.0])];
        let refs: Vec<&SensorSample> = samples.iter().collect();
        let score = EventRateUbpk.score_trip(&refs);
        let events = score.events.unwrap();
        assert_eq!(events.rapid_accelerations, 1);
        assert!((events.distance_km - 0.05).abs() < 1e-12);
        assert!((score.ratio.value() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_samples_scores_zero_in_both_modes() {
        for mode in [UbpkMode::SensorValidity, UbpkMode::EventRate] {
            let strategy = strategy_for(mode);
            assert_eq!(strategy.mode(), mode);
            assert_eq!(strategy.score_trip(&[]).ratio.value(), 0.0);
        }
    }
}
