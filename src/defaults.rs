/// Compile-time constants shared by every node type.
///
/// Thresholds, intervals and plausibility bounds are fixed at build time.
/// Runtime config structs (`ParkingConfig`, `TrafficConfig`, `SessionConfig`)
/// start from these values.

// ── Modem protocol ───────────────────────────────────────────────────

/// Capacity of the modem line buffer in bytes
pub const LINE_CAPACITY: usize = 128;

/// Modem reset command sent once at startup
pub const CMD_RESET: &str = "ATZ";

/// Downlink fetch trigger
pub const CMD_FETCH_DOWNLINK: &str = "AT+CFG";

/// Line terminator appended to every command written to the modem
pub const LINE_ENDING: &[u8] = b"\r\n";

/// Modem reports a successful network join
pub const PREFIX_JOINED: &str = "JOINED";

/// Boot banner printed by the modem after a reset; the session is lost
pub const PREFIX_RESET_BANNER: &str = "Dragino LA66 Device";

/// Modem announces that downlink data is waiting
pub const PREFIX_DOWNLINK_NOTICE: &str = "Run AT+RECVB=? to see detail";

/// Modem echoes downlink data (`<fport>:<hex payload>`) after this prefix
pub const PREFIX_DOWNLINK_DATA: &str = "AT+RECVB=";

/// Minimum time between uplink windows
pub const UPLINK_INTERVAL_MS: u64 = 10_000;

/// Blocking pause before `AT+CFG` so the radio can finish its receive window
pub const DOWNLINK_SETTLE_MS: u32 = 1_000;

// ── Distance detection ───────────────────────────────────────────────

/// Samples averaged per detection window
pub const WINDOW_LEN: usize = 3;

/// Maximum per-sample deviation from the window average (cm)
pub const CONSISTENCY_EPSILON_CM: f32 = 0.5;

/// Samples at or below this are treated as degenerate echoes (cm)
pub const DEGENERATE_SAMPLE_CM: f32 = 0.1;

/// Parking: plausible ultrasonic range, exclusive bounds (cm)
pub const PARKING_MIN_CM: f32 = 0.5;
pub const PARKING_MAX_CM: f32 = 200.0;

/// Parking: deviation from baseline that indicates a vehicle (cm)
pub const PARKING_CHANGE_THRESHOLD_CM: f32 = 0.6;

/// Parking: minimum time between window averages
pub const PARKING_AVERAGE_INTERVAL_MS: u64 = 200;

/// Parking: a candidate must persist this long before the spot is occupied
pub const PARKING_CONFIRM_MS: u64 = 5_000;

/// Parking: baseline calibration sample budget and acceptance floor
pub const CALIBRATION_SAMPLES: usize = 15;
pub const CALIBRATION_MIN_VALID: usize = 10;
pub const CALIBRATION_SAMPLE_INTERVAL_MS: u32 = 200;

/// Traffic: plausible range, exclusive bounds (cm)
pub const TRAFFIC_MIN_CM: f32 = 0.0;
pub const TRAFFIC_MAX_CM: f32 = 50.0;

/// Traffic: minimum time between window averages
pub const TRAFFIC_AVERAGE_INTERVAL_MS: u64 = 300;

/// Traffic: default approach speed that turns the light red (cm/s)
pub const TRAFFIC_SPEED_THRESHOLD: f32 = 10.0;

/// Traffic: object must be closer than this to trigger (cm)
pub const TRAFFIC_PROXIMITY_CM: f32 = 40.0;

/// Traffic: speed below which the cooldown runs (cm/s)
pub const TRAFFIC_LOW_SPEED: f32 = 5.0;

/// Traffic: cooldown that must elapse at low speed before going green
pub const TRAFFIC_COOLDOWN_MS: u64 = 2_000;

/// Traffic: no accepted sample for this long while red forces green
pub const TRAFFIC_STALE_MS: u64 = 5_000;

/// Traffic: exponential smoothing weight of the newest speed estimate
pub const SPEED_SMOOTHING: f32 = 0.7;

// ── Weather alerts ───────────────────────────────────────────────────

pub const TEMP_THRESHOLD: f32 = 30.0;
pub const HUMI_THRESHOLD: f32 = 70.0;
pub const PRES_THRESHOLD: f32 = 1000.0;
pub const ALT_THRESHOLD: f32 = 1000.0;

pub const WEATHER_NO_ALERT: u8 = 0x00;
pub const TEMP_ALERT: u8 = 0x01;
pub const HUMI_ALERT: u8 = 0x02;
pub const PRES_ALERT: u8 = 0x03;
pub const ALT_ALERT: u8 = 0x05;
pub const MULTIPLE_ALERT: u8 = 0x06;

/// Scalar Kalman tuning used for the barometer channels
pub const KALMAN_Q: f32 = 0.018;
pub const KALMAN_R: f32 = 0.542;

// ── Air-quality alerts (bitmask) ─────────────────────────────────────

/// WHO 24h guideline values (µg/m³)
pub const PM25_THRESHOLD: u16 = 25;
pub const PM10_THRESHOLD: u16 = 50;

pub const ALERT_NONE: u8 = 0;
pub const ALERT_PM25: u8 = 1 << 0;
pub const ALERT_PM10: u8 = 1 << 1;
pub const ALERT_AQI: u8 = 1 << 2;
