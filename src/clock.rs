/// Time source abstraction.
///
/// Every time-gated decision (uplink interval, averaging cadence, debounce,
/// cooldown, watchdog) reads a [`Clock`] injected at construction instead of
/// a global tick counter, so state machines run deterministically on the
/// host.
use core::cell::Cell;

use embedded_hal::delay::DelayNs;

/// Monotonic millisecond clock.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin (usually boot).
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Manually advanced clock for host simulation and tests.
///
/// Shared by reference: `&ManualClock` is both a [`Clock`] and a
/// [`DelayNs`], and a delay simply moves time forward. One instance can
/// therefore drive the session tracker, the detectors and the blocking
/// calibration pauses together.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ns: Cell<u64>,
}

impl ManualClock {
    pub const fn new() -> Self {
        Self { now_ns: Cell::new(0) }
    }

    pub const fn starting_at(ms: u64) -> Self {
        Self {
            now_ns: Cell::new(ms * 1_000_000),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.advance_ns(ms * 1_000_000);
    }

    pub fn set(&self, ms: u64) {
        self.now_ns.set(ms * 1_000_000);
    }

    fn advance_ns(&self, ns: u64) {
        self.now_ns.set(self.now_ns.get().saturating_add(ns));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ns.get() / 1_000_000
    }
}

impl DelayNs for &ManualClock {
    fn delay_ns(&mut self, ns: u32) {
        self.advance_ns(u64::from(ns));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(u64::from(ms));
    }
}
