/// Debounced event detection from noisy distance samples.
///
/// Both ultrasonic node types share the same shape: plausibility filter,
/// a three-sample [`DetectionWindow`], a rate-limited average, and a small
/// state machine over [`DetectionState`]. The parking variant compares the
/// average against a calibrated baseline; the traffic variant tracks the
/// approach speed between consecutive averages.

pub mod parking;
pub mod traffic;
pub mod window;

pub use parking::{ParkingConfig, ParkingEvent, ParkingSensor};
pub use traffic::{TrafficConfig, TrafficLight};
pub use window::DetectionWindow;

/// Source of raw distance samples (HC-SR04 style ranger).
///
/// Drivers report failures as NaN or a non-positive value; the detectors
/// discard those like any other implausible sample.
pub trait DistanceSensor {
    fn measure_cm(&mut self) -> f32;
}

impl<F: FnMut() -> f32> DistanceSensor for F {
    fn measure_cm(&mut self) -> f32 {
        self()
    }
}

/// Exclusive plausibility bounds for a ranger, in cm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceRange {
    pub min: f32,
    pub max: f32,
}

impl DistanceRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// NaN is never plausible.
    pub fn contains(&self, cm: f32) -> bool {
        cm > self.min && cm < self.max
    }
}

/// Detector state. `since` is the clock time the state was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionState {
    Idle,
    /// Condition seen, waiting out the debounce period
    Candidate { since: u64 },
    /// Condition confirmed
    Confirmed { since: u64 },
    /// Condition clearing, waiting out the hysteresis period
    Cooldown { since: u64 },
}

impl DetectionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DetectionState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_bounds_are_exclusive() {
        let range = DistanceRange::new(0.5, 200.0);
        assert!(!range.contains(0.5));
        assert!(range.contains(0.51));
        assert!(range.contains(199.9));
        assert!(!range.contains(200.0));
        assert!(!range.contains(f32::NAN));
        assert!(!range.contains(-1.0));
    }

    #[test]
    fn closures_are_sensors() {
        let mut readings = [12.0f32, 13.0].into_iter();
        let mut sensor = move || readings.next().unwrap_or(f32::NAN);
        assert_eq!(sensor.measure_cm(), 12.0);
        assert_eq!(sensor.measure_cm(), 13.0);
        assert!(sensor.measure_cm().is_nan());
    }
}
