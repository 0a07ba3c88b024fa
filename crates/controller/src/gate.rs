//! "Not-before" deadlines that pace the controller: sensor cadence,
//! post-watering cooldown and the valve auto-close deadline.

use time::{Duration, PrimitiveDateTime};

/// A deadline-based guard. An unset gate behaves like a deadline far in the
/// past, i.e. it is always due.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeGate {
    deadline: Option<PrimitiveDateTime>,
}

impl TimeGate {
    pub const fn unset() -> Self {
        Self { deadline: None }
    }

    /// True if unset or `now` has reached the deadline.
    pub fn is_due(&self, now: PrimitiveDateTime) -> bool {
        match self.deadline {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }

    /// Set the deadline to `now + seconds`. Always relative to the clock
    /// reading passed in, never to a previous deadline.
    pub fn arm(&mut self, now: PrimitiveDateTime, seconds: u32) {
        self.deadline = Some(now.saturating_add(Duration::seconds(i64::from(seconds))));
    }

    /// Make the gate due at `now`.
    pub fn force(&mut self, now: PrimitiveDateTime) {
        self.deadline = Some(now);
    }

    pub fn clear(&mut self) {
        *self = Self::unset();
    }

    pub fn deadline(&self) -> Option<PrimitiveDateTime> {
        self.deadline
    }
}

/// The three independent gates owned by the controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeGates {
    pub next_measurement_at: TimeGate,
    pub next_activation_at: TimeGate,
    pub valve_close_at: TimeGate,
}

// ===========================================================================
// Tests
// ===========================================================================
