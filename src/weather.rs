/// Weather station reading and alerting.
///
/// Combines a DHT11 (temperature, humidity) with an HP20x barometer
/// (temperature, pressure, altitude). The barometer channels are noisy and
/// each goes through its own scalar Kalman filter; the reported temperature
/// is the mean of the DHT value and the filtered barometer value.
use crate::alert::{AlertPolicy, AlertRule};
use crate::defaults::{
    ALT_ALERT, ALT_THRESHOLD, HUMI_ALERT, HUMI_THRESHOLD, KALMAN_Q, KALMAN_R, MULTIPLE_ALERT,
    PRES_ALERT, PRES_THRESHOLD, TEMP_ALERT, TEMP_THRESHOLD, WEATHER_NO_ALERT,
};
use crate::payload::MeasurementRecord;

/// Constant-state Kalman filter over a single value.
#[derive(Debug, Clone, Copy)]
pub struct KalmanFilter {
    q: f32,
    r: f32,
    estimate: Option<f32>,
    covariance: f32,
}

impl KalmanFilter {
    pub const fn new(q: f32, r: f32) -> Self {
        Self {
            q,
            r,
            estimate: None,
            covariance: 0.0,
        }
    }

    /// Fold in one measurement and return the new estimate.
    ///
    /// The first measurement seeds the estimate directly.
    pub fn filter(&mut self, measurement: f32) -> f32 {
        let Some(prior) = self.estimate else {
            self.estimate = Some(measurement);
            return measurement;
        };
        let predicted_cov = self.covariance + self.q;
        let gain = predicted_cov / (predicted_cov + self.r);
        let estimate = prior + gain * (measurement - prior);
        self.covariance = (1.0 - gain) * predicted_cov;
        self.estimate = Some(estimate);
        estimate
    }

    pub fn estimate(&self) -> Option<f32> {
        self.estimate
    }
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new(KALMAN_Q, KALMAN_R)
    }
}

/// One DHT11 read. Either field is NaN when the sensor failed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DhtReading {
    pub temperature: f32,
    pub humidity: f32,
}

/// One HP20x read, in the sensor's native hundredths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarometerReading {
    /// Centi-degrees Celsius
    pub temperature: f32,
    /// Centi-hectopascal
    pub pressure: f32,
    /// Centimetres
    pub altitude: f32,
}

pub struct WeatherStation {
    dht_temperature: f32,
    humidity: f32,
    temperature: f32,
    pressure: f32,
    altitude: f32,
    alert: u8,
    temperature_filter: KalmanFilter,
    pressure_filter: KalmanFilter,
    altitude_filter: KalmanFilter,
}

impl WeatherStation {
    pub const fn new() -> Self {
        Self {
            dht_temperature: 0.0,
            humidity: 0.0,
            temperature: 0.0,
            pressure: 0.0,
            altitude: 0.0,
            alert: WEATHER_NO_ALERT,
            temperature_filter: KalmanFilter::new(KALMAN_Q, KALMAN_R),
            pressure_filter: KalmanFilter::new(KALMAN_Q, KALMAN_R),
            altitude_filter: KalmanFilter::new(KALMAN_Q, KALMAN_R),
        }
    }

    /// Process one read cycle and return the alert code.
    pub fn update(&mut self, dht: DhtReading, baro: BarometerReading) -> u8 {
        if dht.temperature.is_nan() {
            log::warn!("DHT temperature read failed, keeping {}", self.dht_temperature);
        } else {
            self.dht_temperature = dht.temperature;
        }
        if !dht.humidity.is_nan() {
            self.humidity = dht.humidity;
        }

        let baro_ok = baro.temperature.is_finite()
            && baro.pressure.is_finite()
            && baro.altitude.is_finite();
        if !baro_ok {
            log::warn!("HP20x read failed, keeping last filtered values");
        }
        if let Some(baro_temperature) = smooth(&mut self.temperature_filter, baro.temperature) {
            self.temperature = (self.dht_temperature + baro_temperature) / 2.0;
        }
        if let Some(pressure) = smooth(&mut self.pressure_filter, baro.pressure) {
            self.pressure = pressure;
        }
        if let Some(altitude) = smooth(&mut self.altitude_filter, baro.altitude) {
            self.altitude = altitude;
        }

        self.alert = self.evaluate_alert();
        log::debug!(
            "Temp: {} C, pressure: {} hPa, humidity: {} %, altitude: {} m, alert: {}",
            self.temperature,
            self.pressure,
            self.humidity,
            self.altitude,
            self.alert
        );
        self.alert
    }

    fn evaluate_alert(&self) -> u8 {
        let rules = [
            AlertRule::above(self.temperature, TEMP_THRESHOLD, TEMP_ALERT),
            AlertRule::above(self.humidity, HUMI_THRESHOLD, HUMI_ALERT),
            AlertRule::below(self.pressure, PRES_THRESHOLD, PRES_ALERT),
            AlertRule::above(self.altitude, ALT_THRESHOLD, ALT_ALERT),
        ];
        AlertPolicy::Precedence {
            none: WEATHER_NO_ALERT,
            multiple: MULTIPLE_ALERT,
        }
        .evaluate(&rules)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn humidity(&self) -> f32 {
        self.humidity
    }

    pub fn pressure(&self) -> f32 {
        self.pressure
    }

    pub fn altitude(&self) -> f32 {
        self.altitude
    }

    pub fn alert(&self) -> u8 {
        self.alert
    }

    pub fn record(&self) -> MeasurementRecord {
        MeasurementRecord::Weather {
            temperature: self.temperature,
            pressure: self.pressure,
            humidity: self.humidity,
            altitude: self.altitude,
            alert: self.alert,
        }
    }
}

/// Filter one barometer channel given in hundredths. A non-finite reading
/// leaves the filter alone and yields its last estimate.
fn smooth(filter: &mut KalmanFilter, raw: f32) -> Option<f32> {
    if raw.is_finite() {
        Some(filter.filter(raw / 100.0))
    } else {
        filter.estimate()
    }
}

impl Default for WeatherStation {
    fn default() -> Self {
        Self::new()
    }
}
