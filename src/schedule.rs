/// Uplink cadence per node type.
///
/// Sensor nodes send on a fixed interval; detector nodes also (or only)
/// send as soon as their reported state changes. Nothing is sent while the
/// session is unjoined, so a state change seen while offline goes out after
/// the join.
use crate::defaults::UPLINK_INTERVAL_MS;
use crate::payload::NodeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPolicy {
    Interval,
    OnChange,
    ChangeOrInterval,
}

impl SendPolicy {
    pub const fn for_node(kind: NodeKind) -> Self {
        match kind {
            NodeKind::AirQuality | NodeKind::Weather => SendPolicy::Interval,
            NodeKind::Parking => SendPolicy::ChangeOrInterval,
            NodeKind::Traffic => SendPolicy::OnChange,
        }
    }

    const fn on_change(self) -> bool {
        matches!(self, SendPolicy::OnChange | SendPolicy::ChangeOrInterval)
    }

    const fn on_interval(self) -> bool {
        matches!(self, SendPolicy::Interval | SendPolicy::ChangeOrInterval)
    }
}

/// Why an uplink is due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendReason {
    StateChanged,
    Interval,
}

pub struct UplinkScheduler {
    policy: SendPolicy,
    interval_ms: u64,
    last_sent_at: u64,
    last_state: Option<u8>,
}

impl UplinkScheduler {
    pub const fn new(policy: SendPolicy, interval_ms: u64) -> Self {
        Self {
            policy,
            interval_ms,
            last_sent_at: 0,
            last_state: None,
        }
    }

    pub const fn for_node(kind: NodeKind) -> Self {
        Self::new(SendPolicy::for_node(kind), UPLINK_INTERVAL_MS)
    }

    /// Check whether to send now. `state` is the detector's reported state
    /// byte (parking state, LED colour); interval-only nodes pass anything.
    pub fn due(&self, now_ms: u64, state: u8, joined: bool) -> Option<SendReason> {
        if !joined {
            return None;
        }
        if self.policy.on_change() && self.last_state != Some(state) {
            return Some(SendReason::StateChanged);
        }
        if self.policy.on_interval() && now_ms.saturating_sub(self.last_sent_at) >= self.interval_ms
        {
            return Some(SendReason::Interval);
        }
        None
    }

    pub fn mark_sent(&mut self, now_ms: u64, state: u8) {
        self.last_sent_at = now_ms;
        self.last_state = Some(state);
    }
}
