//! loranode library: shared core for AT-modem LoRa sensor nodes.
//!
//! One crate serves four node builds (air quality, smart parking, traffic
//! light, weather station). Each node reads its sensors, turns the readings
//! into a compact binary uplink, and hands it to a LoRa modem that speaks a
//! line-oriented AT protocol. Everything here is `no_std` with no allocator
//! and performs no bus I/O of its own: serial ports, sensors, the clock and
//! blocking delays are injected, so the whole pipeline runs on the host
//! under `cargo test`.
//!
//! The library is organized in three layers:
//! - **Link**: `framer`, `session`, `payload`, `schedule`. Modem line
//!   framing, join/downlink tracking and `AT+SENDB` encoding.
//! - **Detection**: `detect`, `alert`, `weather`, `air_quality`. Debounced
//!   distance state machines and threshold alerting.
//! - **Network side**: `decoder`, `protocol`. Payload decoding and NDJSON
//!   rendering of received uplinks.

#![cfg_attr(not(test), no_std)]

pub mod air_quality;
pub mod alert;
pub mod board;
pub mod clock;
pub mod decoder;
pub mod defaults;
pub mod detect;
pub mod error;
pub mod framer;
pub mod payload;
pub mod protocol;
pub mod schedule;
pub mod session;
pub mod weather;
