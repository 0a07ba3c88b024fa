//! Polled push-button debouncing.
//!
//! The controller samples each button once per tick. A level only becomes
//! stable after it has been observed unchanged for the settle window, and a
//! press edge is reported once per stable released -> pressed transition, no
//! matter how long the button is held or how much it bounced on the way.

/// Default settle window in milliseconds.
pub const DEBOUNCE_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    None,
    Pressed,
}

#[derive(Debug, Clone, Copy)]
pub struct DebouncedButton {
    /// Last confirmed level (true = pressed).
    stable: bool,
    /// Raw level currently being timed.
    candidate: bool,
    /// Monotonic time at which `candidate` was first seen.
    candidate_since_ms: u64,
    settle_ms: u64,
}

impl DebouncedButton {
    pub fn new(settle_ms: u64) -> Self {
        Self {
            stable: false,
            candidate: false,
            candidate_since_ms: 0,
            settle_ms,
        }
    }

    /// Feed one sample. `pressed` is the logical level, polarity already
    /// resolved by the board.
    pub fn poll(&mut self, pressed: bool, now_ms: u64) -> Edge {
        if pressed != self.candidate {
            self.candidate = pressed;
            self.candidate_since_ms = now_ms;
            return Edge::None;
        }

        if self.candidate == self.stable {
            return Edge::None;
        }

        if now_ms.saturating_sub(self.candidate_since_ms) < self.settle_ms {
            return Edge::None;
        }

        self.stable = self.candidate;
        if self.stable {
            Edge::Pressed
        } else {
            Edge::None
        }
    }

    #[cfg(test)]
    pub fn is_pressed(&self) -> bool {
        self.stable
    }
}

impl Default for DebouncedButton {
    fn default() -> Self {
        Self::new(DEBOUNCE_MS)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
