/// Fixed ring of the most recent raw samples.
///
/// Slots start at zero and are overwritten in ring order; nothing is ever
/// removed. An average is only meaningful once `N` samples have arrived
/// since construction, and the detectors additionally rate-limit how often
/// they take one.
use libm::fabsf;

use crate::defaults::{CONSISTENCY_EPSILON_CM, DEGENERATE_SAMPLE_CM, WINDOW_LEN};

pub struct DetectionWindow<const N: usize = WINDOW_LEN> {
    samples: [f32; N],
    cursor: usize,
    count: u32,
    last_average_at: Option<u64>,
}

impl<const N: usize> DetectionWindow<N> {
    pub const fn new() -> Self {
        Self {
            samples: [0.0; N],
            cursor: 0,
            count: 0,
            last_average_at: None,
        }
    }

    pub fn push(&mut self, sample: f32) {
        self.samples[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % N;
        self.count = self.count.saturating_add(1);
    }

    /// At least `N` samples collected since construction
    pub fn is_full(&self) -> bool {
        self.count as usize >= N
    }

    /// Full, and at least `interval_ms` since the previous average.
    pub fn average_due(&self, now: u64, interval_ms: u64) -> bool {
        self.is_full()
            && self
                .last_average_at
                .map_or(true, |at| now.saturating_sub(at) >= interval_ms)
    }

    /// Record that an average was taken at `now`.
    pub fn mark_averaged(&mut self, now: u64) {
        self.last_average_at = Some(now);
    }

    pub fn last_average_at(&self) -> Option<u64> {
        self.last_average_at
    }

    pub fn average(&self) -> f32 {
        self.samples.iter().sum::<f32>() / N as f32
    }

    /// Every sample within `CONSISTENCY_EPSILON_CM` of `average` and none
    /// degenerate.
    pub fn is_consistent(&self, average: f32) -> bool {
        self.samples.iter().all(|&s| {
            s > DEGENERATE_SAMPLE_CM && fabsf(s - average) <= CONSISTENCY_EPSILON_CM
        })
    }

    pub fn samples(&self) -> &[f32; N] {
        &self.samples
    }
}

impl<const N: usize> Default for DetectionWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}
