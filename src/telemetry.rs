//! Telemetry sources
//!
//! The camera samples battery and temperature on fixed cadences and folds
//! the readings into its state store. Real hardware plugs in through
//! [`TelemetrySource`]; the built-in synthetic source models the drift of
//! a handheld device so the full pipeline works without hardware.

use crate::state::{BATTERY_MAX, BATTERY_MIN, TEMP_MAX, TEMP_MIN};
use rand::Rng;

/// Produces the next battery and temperature readings.
///
/// `current` is the value presently in the state store; implementations
/// return the replacement. The store clamps whatever comes back.
pub trait TelemetrySource: Send {
    /// Next battery percentage. Called on the battery cadence (5s).
    fn next_battery(&mut self, current: f32, recording: bool) -> f32;

    /// Next enclosure temperature in Fahrenheit. Called on the thermal
    /// cadence (3s).
    fn next_temperature(&mut self, current: f32, recording: bool) -> f32;
}

/// Simulated battery drain and thermal drift.
///
/// Recording drains 0.1%/tick and warms the enclosure; idling trickle
/// charges 0.02%/tick. Temperature does a bounded random walk.
#[derive(Debug, Default)]
pub struct SyntheticTelemetry;

impl SyntheticTelemetry {
    pub fn new() -> Self {
        Self
    }
}

impl TelemetrySource for SyntheticTelemetry {
    fn next_battery(&mut self, current: f32, recording: bool) -> f32 {
        if recording {
            (current - 0.1).max(BATTERY_MIN)
        } else {
            (current + 0.02).min(BATTERY_MAX)
        }
    }

    fn next_temperature(&mut self, current: f32, recording: bool) -> f32 {
        let step: f32 = rand::thread_rng().gen_range(-1.0..1.0);
        let mut next = (current + step).clamp(TEMP_MIN, TEMP_MAX);
        if recording {
            next += 0.2;
        }
        next.clamp(TEMP_MIN, TEMP_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battery_drains_while_recording() {
        let mut source = SyntheticTelemetry::new();
        let next = source.next_battery(85.0, true);
        assert!((next - 84.9).abs() < 1e-4);
    }

    #[test]
    fn test_battery_charges_while_idle() {
        let mut source = SyntheticTelemetry::new();
        let next = source.next_battery(85.0, false);
        assert!((next - 85.02).abs() < 1e-4);
    }

    #[test]
    fn test_battery_respects_bounds() {
        let mut source = SyntheticTelemetry::new();
        assert_eq!(source.next_battery(0.05, true), BATTERY_MIN);
        assert_eq!(source.next_battery(99.99, false), BATTERY_MAX);
    }

    #[test]
    fn test_temperature_stays_in_bounds() {
        let mut source = SyntheticTelemetry::new();
        let mut temp = 72.0;
        for _ in 0..500 {
            temp = source.next_temperature(temp, true);
            assert!((TEMP_MIN..=TEMP_MAX).contains(&temp));
        }
    }
}
