use std::time::Instant;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Time source for the controller.
pub trait Clock {
    /// Local wall-clock time. Drives the gates, the daily rollover and the
    /// log timestamps.
    fn now(&mut self) -> PrimitiveDateTime;

    /// Monotonic milliseconds since an arbitrary origin. Used for button
    /// debouncing only.
    fn monotonic_ms(&mut self) -> u64;
}

/// System clock shifted to a fixed local offset.
pub struct SystemClock {
    offset: UtcOffset,
    origin: Instant,
}

impl SystemClock {
    pub fn new(offset: UtcOffset) -> Self {
        Self {
            offset,
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&mut self) -> PrimitiveDateTime {
        let local = OffsetDateTime::now_utc().to_offset(self.offset);
        PrimitiveDateTime::new(local.date(), local.time())
    }

    fn monotonic_ms(&mut self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Log line timestamp prefix, `YYYYMMDD HH:MM:SS`.
pub fn stamp(t: PrimitiveDateTime) -> String {
    format!(
        "{:04}{:02}{:02} {:02}:{:02}:{:02}",
        t.year(),
        t.month() as u8,
        t.day(),
        t.hour(),
        t.minute(),
        t.second()
    )
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn stamp_zero_pads_fields() {
        assert_eq!(stamp(datetime!(2024-03-07 4:05:09)), "20240307 04:05:09");
    }

    #[test]
    fn stamp_end_of_year() {
        assert_eq!(stamp(datetime!(2023-12-31 23:59:59)), "20231231 23:59:59");
    }

    #[test]
    fn system_clock_applies_offset() {
        let mut utc = SystemClock::new(UtcOffset::UTC);
        let mut plus_two = SystemClock::new(offset!(+2));
        let a = utc.now();
        let b = plus_two.now();
        let diff = (b - a).whole_minutes();
        assert!((119..=120).contains(&diff), "unexpected offset diff: {diff}");
    }

    #[test]
    fn monotonic_ms_does_not_go_backwards() {
        let mut clock = SystemClock::new(UtcOffset::UTC);
        let a = clock.monotonic_ms();
        let b = clock.monotonic_ms();
        assert!(b >= a);
    }
}
