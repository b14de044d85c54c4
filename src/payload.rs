/// Uplink payload encoding.
///
/// Each node type sends one fixed-shape binary record. Integers go out
/// big-endian; floats go out as their raw IEEE-754 bit pattern in
/// little-endian order, which is what the network-side decoder reads. The
/// modem takes the payload as uppercase hex inside an `AT+SENDB` command.
use core::fmt::Write;

use heapless::{String, Vec};

/// Largest payload of any node type (weather)
pub const MAX_PAYLOAD_LEN: usize = 17;

/// Raw payload bytes
pub type Payload = Vec<u8, MAX_PAYLOAD_LEN>;

/// Hex rendering of a payload, two characters per byte
pub type HexPayload = String<{ MAX_PAYLOAD_LEN * 2 }>;

/// Complete `AT+SENDB=...` command line (without terminator)
pub type Command = String<64>;

/// Node variants sharing this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    AirQuality,
    Parking,
    Traffic,
    Weather,
}

impl NodeKind {
    /// Raw payload length in bytes
    pub const fn payload_len(self) -> usize {
        match self {
            NodeKind::AirQuality => 7,
            NodeKind::Parking => 3,
            NodeKind::Traffic => 5,
            NodeKind::Weather => 17,
        }
    }

    /// Whether uplinks request a network acknowledgement
    pub const fn confirmed(self) -> bool {
        !matches!(self, NodeKind::Traffic)
    }

    /// LoRaWAN application port
    pub const fn port(self) -> u8 {
        2
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            NodeKind::AirQuality => "air_quality",
            NodeKind::Parking => "parking",
            NodeKind::Traffic => "traffic",
            NodeKind::Weather => "weather",
        }
    }
}

/// Parking spot occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ParkingState {
    Free = 0,
    Occupied = 1,
}

impl ParkingState {
    pub fn from_byte(b: u8) -> Self {
        if b == 0 {
            ParkingState::Free
        } else {
            ParkingState::Occupied
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParkingState::Free => "FREE",
            ParkingState::Occupied => "OCCUPIED",
        }
    }
}

/// Traffic light colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LedState {
    Green = 0,
    Red = 1,
}

impl LedState {
    pub fn from_byte(b: u8) -> Self {
        if b == 0 {
            LedState::Green
        } else {
            LedState::Red
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LedState::Green => "GREEN",
            LedState::Red => "RED",
        }
    }
}

/// One transmit cycle's measurements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasurementRecord {
    AirQuality {
        pm2_5: u16,
        pm10: u16,
        aqi: u16,
        alert: u8,
    },
    Parking {
        /// Seconds the spot has been occupied; only the low 16 bits are sent
        occupancy_secs: u32,
        state: ParkingState,
    },
    Traffic {
        /// Smoothed approach speed in cm/s
        speed: f32,
        led: LedState,
    },
    Weather {
        temperature: f32,
        pressure: f32,
        humidity: f32,
        altitude: f32,
        alert: u8,
    },
}

impl MeasurementRecord {
    pub fn kind(&self) -> NodeKind {
        match self {
            MeasurementRecord::AirQuality { .. } => NodeKind::AirQuality,
            MeasurementRecord::Parking { .. } => NodeKind::Parking,
            MeasurementRecord::Traffic { .. } => NodeKind::Traffic,
            MeasurementRecord::Weather { .. } => NodeKind::Weather,
        }
    }

    /// Serialize to the node's binary layout.
    pub fn encode(&self) -> Payload {
        let mut out = Payload::new();
        // Every layout is at most MAX_PAYLOAD_LEN bytes, so these cannot fail.
        match *self {
            MeasurementRecord::AirQuality {
                pm2_5,
                pm10,
                aqi,
                alert,
            } => {
                let _ = out.extend_from_slice(&pm2_5.to_be_bytes());
                let _ = out.extend_from_slice(&pm10.to_be_bytes());
                let _ = out.extend_from_slice(&aqi.to_be_bytes());
                let _ = out.push(alert);
            }
            MeasurementRecord::Parking {
                occupancy_secs,
                state,
            } => {
                let truncated = (occupancy_secs & 0xFFFF) as u16;
                let _ = out.extend_from_slice(&truncated.to_be_bytes());
                let _ = out.push(state as u8);
            }
            MeasurementRecord::Traffic { speed, led } => {
                let _ = out.extend_from_slice(&[0, 0]);
                let _ = out.extend_from_slice(&speed_centi(speed).to_be_bytes());
                let _ = out.push(led as u8);
            }
            MeasurementRecord::Weather {
                temperature,
                pressure,
                humidity,
                altitude,
                alert,
            } => {
                for value in [temperature, pressure, humidity, altitude] {
                    let _ = out.extend_from_slice(&float_bytes(value));
                }
                let _ = out.push(alert);
            }
        }
        out
    }

    /// Build the `AT+SENDB=<confirmed>,<port>,<length>,<hex>` command.
    pub fn to_command(&self) -> Command {
        let kind = self.kind();
        let payload = self.encode();
        let mut cmd = Command::new();
        let _ = write!(
            cmd,
            "AT+SENDB={},{},{},{}",
            u8::from(kind.confirmed()),
            kind.port(),
            payload.len(),
            to_hex(&payload)
        );
        cmd
    }
}

/// Speed in hundredths of cm/s, saturated to the 16-bit wire field.
pub fn speed_centi(speed: f32) -> i16 {
    // `as` saturates and maps NaN to 0
    (speed * 100.0) as i16
}

/// 4-byte IEEE-754 bit pattern of `value`, little-endian.
pub fn float_bytes(value: f32) -> [u8; 4] {
    value.to_bits().to_le_bytes()
}

/// Uppercase hex, most-significant nibble first.
pub fn to_hex(bytes: &[u8]) -> HexPayload {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut hex = HexPayload::new();
    for &b in bytes.iter().take(MAX_PAYLOAD_LEN) {
        let _ = hex.push(DIGITS[usize::from(b >> 4)] as char);
        let _ = hex.push(DIGITS[usize::from(b & 0x0F)] as char);
    }
    hex
}
