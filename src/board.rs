/// Pin assignments for the supported node builds.
///
/// Each node module defines its wiring and identity, selected at compile
/// time via feature flags. When several node features are enabled the first
/// in the order parking, traffic, weather, air quality wins.

#[cfg(feature = "node-parking")]
mod hw {
    pub const NODE_NAME: &str = "smart_parking";
    pub const LORA_RX_PIN: u8 = 10;
    pub const LORA_TX_PIN: u8 = 11;
    pub const TRIGGER_PIN: u8 = 5;
    pub const ECHO_PIN: u8 = 6;
    pub const LED_DATA_PIN: u8 = 7; // P9813 chainable RGB LED
    pub const LED_CLOCK_PIN: u8 = 8;
}

#[cfg(all(feature = "node-traffic", not(feature = "node-parking")))]
mod hw {
    pub const NODE_NAME: &str = "traffic_light";
    pub const LORA_RX_PIN: u8 = 10;
    pub const LORA_TX_PIN: u8 = 11;
    pub const TRIGGER_PIN: u8 = 5;
    pub const ECHO_PIN: u8 = 6;
    pub const LED_DATA_PIN: u8 = 7;
    pub const LED_CLOCK_PIN: u8 = 8;
}

#[cfg(all(
    feature = "node-weather",
    not(any(feature = "node-parking", feature = "node-traffic"))
))]
mod hw {
    pub const NODE_NAME: &str = "weather_station";
    pub const LORA_RX_PIN: u8 = 10;
    pub const LORA_TX_PIN: u8 = 11;
    pub const DHT_PIN: u8 = 8; // DHT11; HP20x barometer sits on I2C
}

#[cfg(all(
    feature = "node-air-quality",
    not(any(feature = "node-parking", feature = "node-traffic", feature = "node-weather"))
))]
mod hw {
    pub const NODE_NAME: &str = "air_quality";
    pub const LORA_RX_PIN: u8 = 10;
    pub const LORA_TX_PIN: u8 = 11;
    pub const AQI_SENSOR_PIN: u8 = 14; // A0; HM330X sits on I2C
}

#[cfg(not(any(
    feature = "node-parking",
    feature = "node-traffic",
    feature = "node-weather",
    feature = "node-air-quality"
)))]
mod hw {
    pub const NODE_NAME: &str = "unknown";
}

pub use hw::*;
