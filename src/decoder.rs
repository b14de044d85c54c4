/// Network-side uplink decoding.
///
/// Inverse of [`crate::payload`]: turns the hex string carried by
/// `AT+SENDB` (or the raw bytes a network server hands over) back into a
/// [`MeasurementRecord`]. Used by gateways and bench tools, and by the
/// round-trip checks of the encoder.
use crate::error::DecodeError;
use crate::payload::{LedState, MeasurementRecord, NodeKind, ParkingState, Payload, MAX_PAYLOAD_LEN};

/// Parse an even-length hex string (either case) into payload bytes.
pub fn decode_hex(hex: &str) -> Result<Payload, DecodeError> {
    let digits = hex.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(DecodeError::OddLength(digits.len()));
    }
    if digits.len() / 2 > MAX_PAYLOAD_LEN {
        return Err(DecodeError::TooLong(MAX_PAYLOAD_LEN));
    }

    let mut out = Payload::new();
    for (i, pair) in digits.chunks_exact(2).enumerate() {
        let hi = nibble(pair[0]).ok_or(DecodeError::InvalidHex(i * 2))?;
        let lo = nibble(pair[1]).ok_or(DecodeError::InvalidHex(i * 2 + 1))?;
        out.push((hi << 4) | lo)
            .map_err(|_| DecodeError::TooLong(MAX_PAYLOAD_LEN))?;
    }
    Ok(out)
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Decode a raw payload for the given node type.
///
/// Extra trailing bytes are ignored, matching the network codec.
pub fn decode_uplink(kind: NodeKind, bytes: &[u8]) -> Result<MeasurementRecord, DecodeError> {
    let expected = kind.payload_len();
    if bytes.len() < expected {
        return Err(DecodeError::TooShort {
            expected,
            actual: bytes.len(),
        });
    }

    let be16 = |at: usize| u16::from_be_bytes([bytes[at], bytes[at + 1]]);
    let le_f32 = |at: usize| {
        f32::from_bits(u32::from_le_bytes([
            bytes[at],
            bytes[at + 1],
            bytes[at + 2],
            bytes[at + 3],
        ]))
    };

    let record = match kind {
        NodeKind::AirQuality => MeasurementRecord::AirQuality {
            pm2_5: be16(0),
            pm10: be16(2),
            aqi: be16(4),
            alert: bytes[6],
        },
        NodeKind::Parking => MeasurementRecord::Parking {
            occupancy_secs: u32::from(be16(0)),
            state: ParkingState::from_byte(bytes[2]),
        },
        NodeKind::Traffic => MeasurementRecord::Traffic {
            // bytes 0..2 are reserved
            speed: f32::from(be16(2) as i16) / 100.0,
            led: LedState::from_byte(bytes[4]),
        },
        NodeKind::Weather => MeasurementRecord::Weather {
            temperature: le_f32(0),
            pressure: le_f32(4),
            humidity: le_f32(8),
            altitude: le_f32(12),
            alert: bytes[16],
        },
    };
    Ok(record)
}

/// Decode the hex form used inside `AT+SENDB`.
pub fn decode_hex_uplink(kind: NodeKind, hex: &str) -> Result<MeasurementRecord, DecodeError> {
    let bytes = decode_hex(hex)?;
    decode_uplink(kind, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_accepts_both_cases() {
        assert_eq!(decode_hex("00aBff").unwrap().as_slice(), &[0x00, 0xAB, 0xFF]);
        assert!(decode_hex("").unwrap().is_empty());
    }

    #[test]
    fn hex_rejects_malformed_input() {
        assert_eq!(decode_hex("ABC"), Err(DecodeError::OddLength(3)));
        assert_eq!(decode_hex("0G"), Err(DecodeError::InvalidHex(1)));
        let long = "00".repeat(MAX_PAYLOAD_LEN + 1);
        assert_eq!(decode_hex(&long), Err(DecodeError::TooLong(MAX_PAYLOAD_LEN)));
    }

    #[test]
    fn short_payload_is_rejected() {
        assert_eq!(
            decode_uplink(NodeKind::Weather, &[0; 16]),
            Err(DecodeError::TooShort {
                expected: 17,
                actual: 16
            })
        );
    }

    #[test]
    fn decodes_each_layout() {
        assert_eq!(
            decode_hex_uplink(NodeKind::Parking, "003C01").unwrap(),
            MeasurementRecord::Parking {
                occupancy_secs: 60,
                state: ParkingState::Occupied
            }
        );
        assert_eq!(
            decode_hex_uplink(NodeKind::Traffic, "0000FF6A00").unwrap(),
            MeasurementRecord::Traffic {
                speed: -1.5,
                led: LedState::Green
            }
        );
        assert_eq!(
            decode_hex_uplink(NodeKind::AirQuality, "001E003C002A03").unwrap(),
            MeasurementRecord::AirQuality {
                pm2_5: 30,
                pm10: 60,
                aqi: 42,
                alert: 3
            }
        );
    }

    #[test]
    fn weather_round_trip_through_encoder() {
        let record = MeasurementRecord::Weather {
            temperature: 32.0,
            pressure: 1001.5,
            humidity: 75.0,
            altitude: 85.25,
            alert: 0x06,
        };
        let cmd = record.to_command();
        let hex = cmd.rsplit(',').next().unwrap();
        assert_eq!(decode_hex_uplink(NodeKind::Weather, hex).unwrap(), record);
    }
}
