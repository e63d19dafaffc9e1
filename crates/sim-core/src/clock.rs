//! Simulated calendar driven by fixed eight-hour ticks.

use chrono::{Datelike, Duration, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

/// Simulated hours covered by one tick.
pub const HOURS_PER_TICK: i64 = 8;
/// Fastest selectable speed multiplier.
pub const MAX_SPEED: u32 = 25;
/// Wall-clock period of a tick at 1x speed, in milliseconds.
pub const BASE_TICK_MS: u64 = 1000;

/// Calendar boundaries crossed by a single advance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickBoundaries {
    /// Date before the advance.
    pub previous: NaiveDateTime,
    /// Date after the advance.
    pub current: NaiveDateTime,
    /// Calendar month differs between `previous` and `current`.
    pub month_changed: bool,
    /// `current` is a Monday and `previous` was not.
    pub monday_crossed: bool,
    /// Calendar year differs between `previous` and `current`.
    pub year_changed: bool,
}

/// Simulation clock: current date, speed multiplier and pause flag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    /// Current simulated date and time.
    pub date: NaiveDateTime,
    /// Speed multiplier in `1..=MAX_SPEED`.
    pub speed: u32,
    /// Paused clocks do not advance.
    pub paused: bool,
    /// Set while a pending decision forces speed down to 1x.
    #[serde(skip)]
    pub auto_throttled: bool,
}

impl SimClock {
    /// Start a clock at `date`, running at 1x.
    pub fn new(date: NaiveDateTime) -> Self {
        Self {
            date,
            speed: 1,
            paused: false,
            auto_throttled: false,
        }
    }

    /// Advance by one tick and report the boundaries crossed.
    pub fn advance(&mut self) -> TickBoundaries {
        let previous = self.date;
        let current = previous + Duration::hours(HOURS_PER_TICK);
        self.date = current;
        TickBoundaries {
            previous,
            current,
            month_changed: previous.month() != current.month()
                || previous.year() != current.year(),
            monday_crossed: previous.weekday() != Weekday::Mon
                && current.weekday() == Weekday::Mon,
            year_changed: previous.year() != current.year(),
        }
    }

    /// Current calendar year.
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Zero-based month index of the current date.
    pub fn month0(&self) -> u32 {
        self.date.month0()
    }

    /// Set the speed multiplier, clamped into `1..=MAX_SPEED`.
    pub fn set_speed(&mut self, speed: u32) {
        self.speed = speed.clamp(1, MAX_SPEED);
    }

    /// Flip the pause flag.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Force speed back to 1x while a decision is pending.
    pub fn throttle(&mut self) {
        if self.speed > 1 {
            self.speed = 1;
            self.auto_throttled = true;
        }
    }

    /// Clear the throttle flag once the decision is resolved.
    pub fn release_throttle(&mut self) {
        self.auto_throttled = false;
    }

    /// Wall-clock period between ticks at the current speed.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(BASE_TICK_MS / u64::from(self.speed.max(1)))
    }
}

/// Whole weeks remaining in a notional 48-week trading year, used to pace
/// stock cycles toward their target year.
pub fn trading_weeks_remaining(date: NaiveDateTime, end_year: i32) -> i64 {
    let day_of_year = i64::from(date.month0()) * 30 + i64::from(date.day());
    let week = day_of_year / 7 + 1;
    let years_left = i64::from((end_year - date.year()).max(0));
    (years_left * 48 + (48 - week)).max(1)
}
