//! Daily water budget: seconds of valve-open time consumed since the last
//! observed change of day.
//!
//! The limit is a soft cap. [`DailyBudget::remaining_below_limit`] is checked
//! before a watering starts, so the watering that crosses the limit still runs
//! to completion and the day's total may exceed the limit by up to one
//! watering duration.
//!
//! Rollover compares the day-of-month only. A controller left running across
//! a month boundary where the day number repeats (e.g. from the 1st of one
//! month straight to the 1st of the next without a tick in between) will not
//! reset.

#[derive(Debug, Clone, Copy, Default)]
pub struct DailyBudget {
    consumed_seconds: u32,
    last_reset_day: Option<u8>,
}

impl DailyBudget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current day-of-month. The first call only records the day.
    /// Returns true when a tracked day changed and the budget was zeroed.
    pub fn observe(&mut self, day: u8) -> bool {
        match self.last_reset_day {
            None => {
                self.last_reset_day = Some(day);
                false
            }
            Some(tracked) if tracked == day => false,
            Some(_) => {
                self.consumed_seconds = 0;
                self.last_reset_day = Some(day);
                true
            }
        }
    }

    pub fn consume(&mut self, seconds: u32) {
        self.consumed_seconds = self.consumed_seconds.saturating_add(seconds);
    }

    /// Strict `consumed < limit`.
    pub fn remaining_below_limit(&self, limit: u32) -> bool {
        self.consumed_seconds < limit
    }

    pub fn consumed_seconds(&self) -> u32 {
        self.consumed_seconds
    }

    #[cfg(test)]
    pub fn last_reset_day(&self) -> Option<u8> {
        self.last_reset_day
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -- observe ------------------------------------------------------------

    #[test]
    fn first_observation_initialises_without_reset() {
        let mut b = DailyBudget::new();
        b.consume(180);
        assert!(!b.observe(14));
        assert_eq!(b.last_reset_day(), Some(14));
        assert_eq!(b.consumed_seconds(), 180);
    }

    #[test]
    fn same_day_keeps_consumption() {
        let mut b = DailyBudget::new();
        b.observe(14);
        b.consume(180);
        assert!(!b.observe(14));
        assert_eq!(b.consumed_seconds(), 180);
    }

    #[test]
    fn day_change_resets_exactly_once() {
        let mut b = DailyBudget::new();
        b.observe(14);
        b.consume(540);

        assert!(b.observe(15));
        assert_eq!(b.consumed_seconds(), 0);

        b.consume(180);
        assert!(!b.observe(15));
        assert!(!b.observe(15));
        assert_eq!(b.consumed_seconds(), 180);
    }

    #[test]
    fn month_wrap_resets_on_differing_day_number() {
        let mut b = DailyBudget::new();
        b.observe(31);
        b.consume(360);
        assert!(b.observe(1));
        assert_eq!(b.consumed_seconds(), 0);
    }

    #[test]
    fn same_day_number_in_next_month_does_not_reset() {
        // Only the day-of-month is compared: jumping from June 1st to July
        // 1st without observing any day in between is indistinguishable from
        // staying on June 1st.
        let mut b = DailyBudget::new();
        b.observe(1);
        b.consume(900);
        assert!(!b.observe(1));
        assert_eq!(b.consumed_seconds(), 900);
    }

    // -- consume / limit ----------------------------------------------------

    #[test]
    fn consume_saturates() {
        let mut b = DailyBudget::new();
        b.consume(u32::MAX - 10);
        b.consume(180);
        assert_eq!(b.consumed_seconds(), u32::MAX);
    }

    #[test]
    fn limit_check_is_strict() {
        let mut b = DailyBudget::new();
        assert!(b.remaining_below_limit(900));
        b.consume(720);
        assert!(b.remaining_below_limit(900));
        b.consume(180);
        assert!(!b.remaining_below_limit(900));
    }

    #[test]
    fn soft_cap_allows_overrun_by_one_watering() {
        let mut b = DailyBudget::new();
        b.consume(800);
        // 800 < 900, so one more 180 s watering is admitted.
        assert!(b.remaining_below_limit(900));
        b.consume(180);
        assert_eq!(b.consumed_seconds(), 980);
        assert!(!b.remaining_below_limit(900));
    }
}
