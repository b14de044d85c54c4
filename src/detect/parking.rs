/// Parking spot occupancy detector.
///
/// An ultrasonic ranger looks down at the spot. At startup the empty-spot
/// distance is calibrated into a baseline; afterwards a vehicle shows up as
/// a consistent window average that deviates from the baseline by more than
/// the change threshold. The deviation must persist for the confirmation
/// period before the spot is reported occupied, and a consistent return to
/// the baseline frees it again.
use embedded_hal::delay::DelayNs;
use libm::fabsf;

use super::{DetectionState, DetectionWindow, DistanceRange, DistanceSensor};
use crate::clock::Clock;
use crate::defaults::{
    CALIBRATION_MIN_VALID, CALIBRATION_SAMPLES, CALIBRATION_SAMPLE_INTERVAL_MS,
    PARKING_AVERAGE_INTERVAL_MS, PARKING_CHANGE_THRESHOLD_CM, PARKING_CONFIRM_MS,
    PARKING_MAX_CM, PARKING_MIN_CM,
};
use crate::payload::{MeasurementRecord, ParkingState};

/// Runtime-tunable parking parameters.
#[derive(Debug, Clone, Copy)]
pub struct ParkingConfig {
    pub range: DistanceRange,
    /// Deviation from baseline that counts as a vehicle (cm)
    pub change_threshold_cm: f32,
    pub average_interval_ms: u64,
    /// Debounce before a candidate becomes an occupied spot
    pub confirm_ms: u64,
    /// Plausible calibration samples required out of `CALIBRATION_SAMPLES`
    pub calibration_min_valid: usize,
    pub calibration_interval_ms: u32,
}

impl ParkingConfig {
    pub const fn new() -> Self {
        Self {
            range: DistanceRange::new(PARKING_MIN_CM, PARKING_MAX_CM),
            change_threshold_cm: PARKING_CHANGE_THRESHOLD_CM,
            average_interval_ms: PARKING_AVERAGE_INTERVAL_MS,
            confirm_ms: PARKING_CONFIRM_MS,
            calibration_min_valid: CALIBRATION_MIN_VALID,
            calibration_interval_ms: CALIBRATION_SAMPLE_INTERVAL_MS,
        }
    }
}

impl Default for ParkingConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference distance of the empty spot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineEstimate {
    pub distance_cm: f32,
    pub calibrated: bool,
}

/// Something noteworthy happened during an update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParkingEvent {
    Calibrated { baseline_cm: f32 },
    CalibrationFailed { valid: usize },
    /// Deviation seen, debounce started
    VehicleDetected,
    /// Deviation persisted; the spot is occupied
    Occupied,
    /// Deviation vanished before confirmation
    FalseDetection,
    /// Vehicle left an occupied spot
    Freed,
}

/// Average of the middle 60% of the plausible readings.
///
/// Sorts `readings` in place. Returns `None` with fewer than `min_valid`
/// readings or when the result is not a positive distance.
pub fn trimmed_baseline(readings: &mut [f32], min_valid: usize) -> Option<f32> {
    let n = readings.len();
    if n < min_valid.max(1) {
        return None;
    }
    readings.sort_unstable_by(f32::total_cmp);

    let start = n * 2 / 10;
    let end = n * 8 / 10;
    let middle = &readings[start..end];
    if middle.is_empty() {
        return None;
    }
    let baseline = middle.iter().sum::<f32>() / middle.len() as f32;
    (baseline > 0.0).then_some(baseline)
}

/// Ultrasonic parking detector. Owns its ranger, clock and delay provider.
pub struct ParkingSensor<S, C, D> {
    sensor: S,
    clock: C,
    delay: D,
    config: ParkingConfig,
    window: DetectionWindow,
    baseline: BaselineEstimate,
    state: DetectionState,
    current_distance: f32,
}

impl<S, C, D> ParkingSensor<S, C, D>
where
    S: DistanceSensor,
    C: Clock,
    D: DelayNs,
{
    pub fn new(sensor: S, clock: C, delay: D, config: ParkingConfig) -> Self {
        Self {
            sensor,
            clock,
            delay,
            config,
            window: DetectionWindow::new(),
            baseline: BaselineEstimate {
                distance_cm: 0.0,
                calibrated: false,
            },
            state: DetectionState::Idle,
            current_distance: 0.0,
        }
    }

    /// Calibrate the baseline. Detection stays inert until this succeeds.
    pub fn begin(&mut self) -> ParkingEvent {
        log::info!("Parking sensor initialized. Calibrating baseline...");
        self.calibrate()
    }

    /// Sample the empty spot and derive the baseline.
    ///
    /// Blocks for `CALIBRATION_SAMPLES` × `calibration_interval_ms`.
    pub fn calibrate(&mut self) -> ParkingEvent {
        let mut readings = [0.0f32; CALIBRATION_SAMPLES];
        let mut valid = 0;

        for i in 0..CALIBRATION_SAMPLES {
            let distance = self.sensor.measure_cm();
            if self.config.range.contains(distance) {
                readings[valid] = distance;
                valid += 1;
                log::debug!("Calibration reading #{}: {} cm", i + 1, distance);
            }
            self.delay.delay_ms(self.config.calibration_interval_ms);
        }

        match trimmed_baseline(&mut readings[..valid], self.config.calibration_min_valid) {
            Some(baseline_cm) => {
                self.baseline = BaselineEstimate {
                    distance_cm: baseline_cm,
                    calibrated: true,
                };
                log::info!("Baseline distance calibrated: {} cm", baseline_cm);
                ParkingEvent::Calibrated { baseline_cm }
            }
            None => {
                log::warn!(
                    "Calibration failed ({} valid readings), will retry on next update",
                    valid
                );
                ParkingEvent::CalibrationFailed { valid }
            }
        }
    }

    /// One detection cycle: retry calibration if needed, otherwise read the
    /// ranger and run the state machine.
    pub fn update(&mut self) -> Option<ParkingEvent> {
        if !self.baseline.calibrated {
            // TODO: cap retries once a fallback baseline source exists; an
            // uncalibratable spot currently blocks every cycle here.
            return Some(self.calibrate());
        }
        let raw = self.sensor.measure_cm();
        self.process_sample(raw)
    }

    /// Feed one raw sample taken at the current clock time.
    pub fn process_sample(&mut self, raw_cm: f32) -> Option<ParkingEvent> {
        if !self.baseline.calibrated {
            return None;
        }
        if !self.config.range.contains(raw_cm) {
            log::debug!("Discarding implausible distance {} cm", raw_cm);
            return None;
        }

        let now = self.clock.now_ms();
        self.window.push(raw_cm);
        if !self.window.average_due(now, self.config.average_interval_ms) {
            return None;
        }
        self.window.mark_averaged(now);

        let average = self.window.average();
        self.current_distance = average;
        let consistent = self.window.is_consistent(average);
        let deviation = fabsf(average - self.baseline.distance_cm);
        log::debug!(
            "Avg distance: {} cm, baseline: {} cm, difference: {} cm, consistent: {}",
            average,
            self.baseline.distance_cm,
            deviation,
            consistent
        );

        if !consistent {
            return None;
        }

        if deviation > self.config.change_threshold_cm {
            match self.state {
                DetectionState::Idle => {
                    self.state = DetectionState::Candidate { since: now };
                    log::info!("Vehicle detected");
                    Some(ParkingEvent::VehicleDetected)
                }
                DetectionState::Candidate { since }
                    if now.saturating_sub(since) >= self.config.confirm_ms =>
                {
                    self.state = DetectionState::Confirmed { since };
                    log::info!("Parking confirmed after {} ms", now - since);
                    Some(ParkingEvent::Occupied)
                }
                _ => None,
            }
        } else {
            match self.state {
                DetectionState::Candidate { .. } => {
                    self.state = DetectionState::Idle;
                    log::info!("False detection, spot stays FREE");
                    Some(ParkingEvent::FalseDetection)
                }
                DetectionState::Confirmed { .. } => {
                    self.state = DetectionState::Idle;
                    log::info!("Vehicle left, spot is now FREE");
                    Some(ParkingEvent::Freed)
                }
                _ => None,
            }
        }
    }

    pub fn parking_state(&self) -> ParkingState {
        match self.state {
            DetectionState::Confirmed { .. } => ParkingState::Occupied,
            _ => ParkingState::Free,
        }
    }

    /// Whole seconds since the vehicle was first detected, 0 when free.
    pub fn occupancy_seconds(&self) -> u32 {
        match self.state {
            DetectionState::Confirmed { since } => {
                (self.clock.now_ms().saturating_sub(since) / 1000) as u32
            }
            _ => 0,
        }
    }

    pub fn record(&self) -> MeasurementRecord {
        MeasurementRecord::Parking {
            occupancy_secs: self.occupancy_seconds(),
            state: self.parking_state(),
        }
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn baseline(&self) -> BaselineEstimate {
        self.baseline
    }

    pub fn current_distance(&self) -> f32 {
        self.current_distance
    }
}
