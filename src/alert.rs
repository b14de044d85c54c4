/// Threshold alert aggregation.
///
/// A node checks an ordered list of [`AlertRule`]s every read cycle and
/// folds the firing rules into one alert byte. Two folding policies exist
/// and they are not interchangeable: the weather node reports a single code
/// and collapses simultaneous alerts into a reserved "multiple" code, while
/// the air-quality node ORs independent alert bits together. Nothing is
/// remembered between cycles.

/// Which side of the threshold raises the alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Alert when `value > threshold`
    Above,
    /// Alert when `value < threshold`
    Below,
}

/// One threshold check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertRule {
    pub value: f32,
    pub threshold: f32,
    pub code: u8,
    pub direction: Direction,
}

impl AlertRule {
    pub const fn above(value: f32, threshold: f32, code: u8) -> Self {
        Self {
            value,
            threshold,
            code,
            direction: Direction::Above,
        }
    }

    pub const fn below(value: f32, threshold: f32, code: u8) -> Self {
        Self {
            value,
            threshold,
            code,
            direction: Direction::Below,
        }
    }

    /// NaN never fires.
    pub fn fires(&self) -> bool {
        match self.direction {
            Direction::Above => self.value > self.threshold,
            Direction::Below => self.value < self.threshold,
        }
    }
}

/// How firing rules combine into the alert byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPolicy {
    /// One firing rule reports its own code; two or more report `multiple`.
    Precedence { none: u8, multiple: u8 },
    /// Codes are bit flags, OR-ed together.
    Bitmask,
}

impl AlertPolicy {
    pub fn evaluate(&self, rules: &[AlertRule]) -> u8 {
        match *self {
            AlertPolicy::Precedence { none, multiple } => {
                let mut state = none;
                let mut fired = 0usize;
                for rule in rules.iter().filter(|r| r.fires()) {
                    state = rule.code;
                    fired += 1;
                }
                if fired > 1 {
                    multiple
                } else {
                    state
                }
            }
            AlertPolicy::Bitmask => rules
                .iter()
                .filter(|r| r.fires())
                .fold(0, |acc, r| acc | r.code),
        }
    }
}
