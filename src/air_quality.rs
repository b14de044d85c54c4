/// Air-quality monitoring.
///
/// Particle concentrations come from an HM330X laser sensor over I2C; a
/// separate analog gas sensor contributes a raw value and a coarse pollution
/// level. Alerts are independent bits (see [`AlertPolicy::Bitmask`]).
use crate::alert::{AlertPolicy, AlertRule};
use crate::defaults::{ALERT_AQI, ALERT_NONE, ALERT_PM10, ALERT_PM25, PM10_THRESHOLD, PM25_THRESHOLD};
use crate::payload::MeasurementRecord;

/// Length of an HM330X measurement frame
pub const HM330X_FRAME_LEN: usize = 29;

/// Particle concentrations in µg/m³ (standard particle, atmospheric values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParticleReading {
    pub pm1_0: u16,
    pub pm2_5: u16,
    pub pm10: u16,
}

impl ParticleReading {
    /// Pull the atmospheric PM1.0/PM2.5/PM10 words out of a raw HM330X
    /// frame. Returns None for a short frame.
    pub fn from_frame(frame: &[u8]) -> Option<Self> {
        if frame.len() < HM330X_FRAME_LEN {
            return None;
        }
        let word = |i: usize| u16::from_be_bytes([frame[i * 2], frame[i * 2 + 1]]);
        Some(Self {
            pm1_0: word(4),
            pm2_5: word(5),
            pm10: word(6),
        })
    }
}

/// Trend reported by the analog gas sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiLevel {
    ForceSignal,
    HighPollution,
    LowPollution,
    FreshAir,
}

impl AqiLevel {
    /// Map the sensor driver's numeric level.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(AqiLevel::ForceSignal),
            1 => Some(AqiLevel::HighPollution),
            2 => Some(AqiLevel::LowPollution),
            3 => Some(AqiLevel::FreshAir),
            _ => None,
        }
    }

    pub fn is_polluted(self) -> bool {
        matches!(self, AqiLevel::ForceSignal | AqiLevel::HighPollution)
    }
}

pub struct AirQualityMonitor {
    particles: ParticleReading,
    aqi_value: u16,
    aqi_level: Option<AqiLevel>,
    alert: u8,
}

impl AirQualityMonitor {
    pub const fn new() -> Self {
        Self {
            particles: ParticleReading {
                pm1_0: 0,
                pm2_5: 0,
                pm10: 0,
            },
            aqi_value: 0,
            aqi_level: None,
            alert: ALERT_NONE,
        }
    }

    /// Process one read cycle. `particles` is None when the HM330X read
    /// failed; the previous concentrations are kept and false is returned.
    pub fn update(
        &mut self,
        particles: Option<ParticleReading>,
        aqi_value: u16,
        aqi_level: AqiLevel,
    ) -> bool {
        let ok = match particles {
            Some(reading) => {
                self.particles = reading;
                true
            }
            None => {
                log::warn!("HM330X read failed!");
                false
            }
        };
        self.aqi_value = aqi_value;
        self.aqi_level = Some(aqi_level);
        self.alert = self.evaluate_alert();
        ok
    }

    fn evaluate_alert(&self) -> u8 {
        let rules = [
            AlertRule::above(
                f32::from(self.particles.pm2_5),
                f32::from(PM25_THRESHOLD),
                ALERT_PM25,
            ),
            AlertRule::above(
                f32::from(self.particles.pm10),
                f32::from(PM10_THRESHOLD),
                ALERT_PM10,
            ),
        ];
        let mut alert = AlertPolicy::Bitmask.evaluate(&rules);
        if self.aqi_level.is_some_and(AqiLevel::is_polluted) {
            alert |= ALERT_AQI;
        }
        alert
    }

    pub fn particles(&self) -> ParticleReading {
        self.particles
    }

    pub fn aqi_value(&self) -> u16 {
        self.aqi_value
    }

    pub fn aqi_level(&self) -> Option<AqiLevel> {
        self.aqi_level
    }

    pub fn alert(&self) -> u8 {
        self.alert
    }

    pub fn record(&self) -> MeasurementRecord {
        MeasurementRecord::AirQuality {
            pm2_5: self.particles.pm2_5,
            pm10: self.particles.pm10,
            aqi: self.aqi_value,
            alert: self.alert,
        }
    }
}

impl Default for AirQualityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pm(pm2_5: u16, pm10: u16) -> Option<ParticleReading> {
        Some(ParticleReading {
            pm1_0: 0,
            pm2_5,
            pm10,
        })
    }

    #[test]
    fn pm25_alone_sets_one_bit() {
        let mut monitor = AirQualityMonitor::new();
        assert!(monitor.update(pm(30, 40), 100, AqiLevel::FreshAir));
        assert_eq!(monitor.alert(), ALERT_PM25);
    }

    #[test]
    fn pm25_and_pm10_set_both_bits() {
        let mut monitor = AirQualityMonitor::new();
        monitor.update(pm(30, 60), 100, AqiLevel::LowPollution);
        assert_eq!(monitor.alert(), ALERT_PM25 | ALERT_PM10);
    }

    #[test]
    fn thresholds_are_strict() {
        let mut monitor = AirQualityMonitor::new();
        monitor.update(pm(25, 50), 100, AqiLevel::FreshAir);
        assert_eq!(monitor.alert(), ALERT_NONE);
    }

    #[test]
    fn gas_sensor_level_sets_aqi_bit() {
        let mut monitor = AirQualityMonitor::new();
        monitor.update(pm(10, 10), 700, AqiLevel::HighPollution);
        assert_eq!(monitor.alert(), ALERT_AQI);
        monitor.update(pm(10, 10), 900, AqiLevel::ForceSignal);
        assert_eq!(monitor.alert(), ALERT_AQI);
        monitor.update(pm(60, 60), 90, AqiLevel::FreshAir);
        assert_eq!(monitor.alert(), ALERT_PM25 | ALERT_PM10);
    }

    #[test]
    fn failed_particle_read_keeps_previous_values() {
        let mut monitor = AirQualityMonitor::new();
        monitor.update(pm(30, 60), 100, AqiLevel::FreshAir);
        assert!(!monitor.update(None, 120, AqiLevel::FreshAir));
        assert_eq!(monitor.particles().pm2_5, 30);
        assert_eq!(monitor.aqi_value(), 120);
        assert_eq!(monitor.alert(), ALERT_PM25 | ALERT_PM10);
        assert_eq!(
            monitor.record(),
            MeasurementRecord::AirQuality {
                pm2_5: 30,
                pm10: 60,
                aqi: 120,
                alert: ALERT_PM25 | ALERT_PM10,
            }
        );
    }

    #[test]
    fn hm330x_frame_words() {
        let mut frame = [0u8; HM330X_FRAME_LEN];
        frame[8..14].copy_from_slice(&[0x00, 0x0C, 0x00, 0x1E, 0x01, 0x2C]);
        assert_eq!(
            ParticleReading::from_frame(&frame),
            Some(ParticleReading {
                pm1_0: 12,
                pm2_5: 30,
                pm10: 300,
            })
        );
        assert_eq!(ParticleReading::from_frame(&frame[..20]), None);
    }

    #[test]
    fn aqi_level_codes() {
        assert_eq!(AqiLevel::from_code(1), Some(AqiLevel::HighPollution));
        assert_eq!(AqiLevel::from_code(3), Some(AqiLevel::FreshAir));
        assert_eq!(AqiLevel::from_code(9), None);
        assert!(!AqiLevel::LowPollution.is_polluted());
    }
}
