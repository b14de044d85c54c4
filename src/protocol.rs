/// JSON rendering of decoded uplinks.
///
/// Mirrors the objects produced by the network server's payload codec so a
/// gateway or bench tool can print decoded uplinks as NDJSON. Field names
/// follow the codec (camelCase) rather than Rust conventions.
/// Uses `heapless` types for no_std/no-alloc operation.
use core::fmt::Write;

use heapless::String;
use serde::Serialize;

use crate::defaults::{
    ALERT_AQI, ALERT_PM10, ALERT_PM25, ALT_ALERT, HUMI_ALERT, MULTIPLE_ALERT, PRES_ALERT,
    TEMP_ALERT,
};
use crate::payload::{LedState, MeasurementRecord};

/// Human-readable duration such as "1h 2m 3s"
pub type DurationString = String<16>;

/// A decoded uplink as the network codec reports it
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum UplinkMessage {
    #[serde(rename = "air_quality")]
    AirQuality {
        pm25: u16,
        pm10: u16,
        #[serde(rename = "aqiValue")]
        aqi_value: u16,
        #[serde(rename = "alertState")]
        alert_state: u8,
        #[serde(rename = "alertPM25")]
        alert_pm25: bool,
        #[serde(rename = "alertPM10")]
        alert_pm10: bool,
        #[serde(rename = "alertAQI")]
        alert_aqi: bool,
        #[serde(rename = "airQualityStatus")]
        status: &'static str,
    },
    #[serde(rename = "parking")]
    Parking {
        #[serde(rename = "occupancyTime")]
        occupancy_time: u16,
        #[serde(rename = "formattedOccupancyTime")]
        formatted: DurationString,
        #[serde(rename = "parkingState")]
        state: u8,
        #[serde(rename = "parkingStatus")]
        status: &'static str,
    },
    #[serde(rename = "traffic")]
    Traffic {
        speed: f32,
        #[serde(rename = "ledState")]
        led_state: u8,
        #[serde(rename = "ledColor")]
        led_color: &'static str,
        #[serde(rename = "trafficStatus")]
        status: &'static str,
    },
    #[serde(rename = "weather")]
    Weather {
        temperature: f32,
        pressure: f32,
        humidity: f32,
        altitude: f32,
        #[serde(rename = "alertState")]
        alert_state: u8,
        #[serde(rename = "alertMessage")]
        alert_message: &'static str,
    },
}

impl UplinkMessage {
    pub fn from_record(record: &MeasurementRecord) -> Self {
        match *record {
            MeasurementRecord::AirQuality {
                pm2_5,
                pm10,
                aqi,
                alert,
            } => UplinkMessage::AirQuality {
                pm25: pm2_5,
                pm10,
                aqi_value: aqi,
                alert_state: alert,
                alert_pm25: alert & ALERT_PM25 != 0,
                alert_pm10: alert & ALERT_PM10 != 0,
                alert_aqi: alert & ALERT_AQI != 0,
                status: air_quality_status(alert),
            },
            MeasurementRecord::Parking {
                occupancy_secs,
                state,
            } => {
                let secs = (occupancy_secs & 0xFFFF) as u16;
                UplinkMessage::Parking {
                    occupancy_time: secs,
                    formatted: format_duration(secs),
                    state: state as u8,
                    status: state.as_str(),
                }
            }
            MeasurementRecord::Traffic { speed, led } => UplinkMessage::Traffic {
                speed,
                led_state: led as u8,
                led_color: led.as_str(),
                status: match led {
                    LedState::Red => "WARNING: Object approaching too fast",
                    LedState::Green => "Normal traffic flow",
                },
            },
            MeasurementRecord::Weather {
                temperature,
                pressure,
                humidity,
                altitude,
                alert,
            } => UplinkMessage::Weather {
                temperature,
                pressure,
                humidity,
                altitude,
                alert_state: alert,
                alert_message: weather_alert_message(alert),
            },
        }
    }
}

/// Overall verdict derived from the air-quality alert bits
pub fn air_quality_status(alert: u8) -> &'static str {
    if alert == 0 {
        "Good"
    } else if alert & ALERT_AQI != 0 {
        "Very Poor"
    } else if alert & ALERT_PM25 != 0 && alert & ALERT_PM10 != 0 {
        "Poor"
    } else if alert & (ALERT_PM25 | ALERT_PM10) != 0 {
        "Moderate"
    } else {
        "Unknown"
    }
}

pub fn weather_alert_message(alert: u8) -> &'static str {
    match alert {
        TEMP_ALERT => "Temperature Alert",
        HUMI_ALERT => "Humidity Alert",
        PRES_ALERT => "Pressure Alert",
        ALT_ALERT => "Altitude Alert",
        MULTIPLE_ALERT => "Multiple Alerts",
        _ => "No Alert",
    }
}

/// "42s" below a minute, otherwise "[Xh ]Ym Zs".
pub fn format_duration(secs: u16) -> DurationString {
    let mut out = DurationString::new();
    if secs < 60 {
        let _ = write!(out, "{}s", secs);
        return out;
    }
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        let _ = write!(out, "{}h ", hours);
    }
    // always true past the first minute
    let _ = write!(out, "{}m {}s", minutes, seconds);
    out
}

/// Maximum size of a serialized JSON message
pub const MAX_MSG_LEN: usize = 256;

/// Serialize an [`UplinkMessage`] as one NDJSON line into `buf`.
/// Returns the number of bytes written, or None if serialization failed.
pub fn serialize_message(msg: &UplinkMessage, buf: &mut [u8]) -> Option<usize> {
    match serde_json_core::to_slice(msg, buf) {
        Ok(len) => {
            // Append newline for NDJSON
            if len < buf.len() {
                buf[len] = b'\n';
                Some(len + 1)
            } else {
                Some(len)
            }
        }
        Err(_) => None,
    }
}
