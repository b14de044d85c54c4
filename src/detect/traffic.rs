/// Approach-speed traffic light.
///
/// The ranger faces oncoming objects. Speed is the change between
/// consecutive window averages over the time between them, positive when
/// the object gets closer, smoothed with an exponential moving average. A
/// fast, close, approaching object turns the light red. Going back to green
/// needs the speed to stay low for the whole cooldown, and a watchdog
/// resets a red light whose ranger stopped producing plausible samples.
use super::{DetectionState, DetectionWindow, DistanceRange, DistanceSensor};
use crate::clock::Clock;
use crate::defaults::{
    SPEED_SMOOTHING, TRAFFIC_AVERAGE_INTERVAL_MS, TRAFFIC_COOLDOWN_MS, TRAFFIC_LOW_SPEED,
    TRAFFIC_MAX_CM, TRAFFIC_MIN_CM, TRAFFIC_PROXIMITY_CM, TRAFFIC_SPEED_THRESHOLD,
    TRAFFIC_STALE_MS,
};
use crate::payload::{LedState, MeasurementRecord};

#[derive(Debug, Clone, Copy)]
pub struct TrafficConfig {
    pub range: DistanceRange,
    /// Smoothed approach speed that turns the light red (cm/s)
    pub speed_threshold: f32,
    pub proximity_cm: f32,
    pub low_speed: f32,
    pub cooldown_ms: u64,
    pub stale_ms: u64,
    pub average_interval_ms: u64,
    /// Weight of the newest estimate in the moving average
    pub smoothing: f32,
}

impl TrafficConfig {
    pub const fn new() -> Self {
        Self {
            range: DistanceRange::new(TRAFFIC_MIN_CM, TRAFFIC_MAX_CM),
            speed_threshold: TRAFFIC_SPEED_THRESHOLD,
            proximity_cm: TRAFFIC_PROXIMITY_CM,
            low_speed: TRAFFIC_LOW_SPEED,
            cooldown_ms: TRAFFIC_COOLDOWN_MS,
            stale_ms: TRAFFIC_STALE_MS,
            average_interval_ms: TRAFFIC_AVERAGE_INTERVAL_MS,
            smoothing: SPEED_SMOOTHING,
        }
    }

    pub const fn with_speed_threshold(mut self, threshold: f32) -> Self {
        self.speed_threshold = threshold;
        self
    }
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TrafficLight<S, C> {
    sensor: S,
    clock: C,
    config: TrafficConfig,
    window: DetectionWindow,
    state: DetectionState,
    speed: f32,
    last_distance: Option<f32>,
    last_sample_at: Option<u64>,
}

impl<S, C> TrafficLight<S, C>
where
    S: DistanceSensor,
    C: Clock,
{
    pub fn new(sensor: S, clock: C, config: TrafficConfig) -> Self {
        log::info!("Traffic light initialized in GREEN state");
        Self {
            sensor,
            clock,
            config,
            window: DetectionWindow::new(),
            state: DetectionState::Idle,
            speed: 0.0,
            last_distance: None,
            last_sample_at: None,
        }
    }

    /// Read the ranger once. Returns the new colour when it changed.
    pub fn update(&mut self) -> Option<LedState> {
        let raw = self.sensor.measure_cm();
        self.process_sample(raw)
    }

    /// Feed one raw sample taken at the current clock time.
    pub fn process_sample(&mut self, raw_cm: f32) -> Option<LedState> {
        let now = self.clock.now_ms();

        if !self.config.range.contains(raw_cm) {
            return self.check_stale(now);
        }

        self.window.push(raw_cm);
        self.last_sample_at = Some(now);

        let previous_at = self.window.last_average_at();
        if !self.window.average_due(now, self.config.average_interval_ms) {
            return None;
        }
        self.window.mark_averaged(now);
        let average = self.window.average();

        let mut change = None;
        if let (Some(last), Some(at)) = (self.last_distance, previous_at) {
            let dt = now.saturating_sub(at) as f32 / 1000.0;
            let instant = (last - average) / dt;
            self.speed =
                self.config.smoothing * instant + (1.0 - self.config.smoothing) * self.speed;
            log::debug!("Avg distance: {} cm, speed: {} cm/s", average, self.speed);

            let approaching = average < last;
            if self.speed > self.config.speed_threshold
                && approaching
                && average < self.config.proximity_cm
            {
                match self.state {
                    DetectionState::Idle => {
                        log::info!("Fast approaching object detected, switching to RED");
                        self.state = DetectionState::Confirmed { since: now };
                        change = Some(LedState::Red);
                    }
                    DetectionState::Cooldown { .. } => {
                        self.state = DetectionState::Confirmed { since: now };
                    }
                    _ => {}
                }
            } else if self.speed < self.config.low_speed {
                match self.state {
                    DetectionState::Confirmed { .. } => {
                        self.state = DetectionState::Cooldown { since: now };
                    }
                    DetectionState::Cooldown { since }
                        if now.saturating_sub(since) >= self.config.cooldown_ms =>
                    {
                        log::info!("Object has slowed down, switching to GREEN");
                        self.state = DetectionState::Idle;
                        change = Some(LedState::Green);
                    }
                    _ => {}
                }
            } else if let DetectionState::Cooldown { .. } = self.state {
                // Speed picked up again; the cooldown starts over next time
                self.state = DetectionState::Confirmed { since: now };
            }
        }

        self.last_distance = Some(average);
        change
    }

    fn check_stale(&mut self, now: u64) -> Option<LedState> {
        if self.state.is_idle() {
            return None;
        }
        let stale = self
            .last_sample_at
            .map_or(true, |at| now.saturating_sub(at) >= self.config.stale_ms);
        if stale {
            log::warn!("No valid readings for {} ms, resetting to GREEN", self.config.stale_ms);
            self.state = DetectionState::Idle;
            Some(LedState::Green)
        } else {
            None
        }
    }

    pub fn led_state(&self) -> LedState {
        if self.state.is_idle() {
            LedState::Green
        } else {
            LedState::Red
        }
    }

    /// Smoothed approach speed in cm/s
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Most recent window average, if one was taken
    pub fn distance(&self) -> Option<f32> {
        self.last_distance
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn record(&self) -> MeasurementRecord {
        MeasurementRecord::Traffic {
            speed: self.speed,
            led: self.led_state(),
        }
    }
}
