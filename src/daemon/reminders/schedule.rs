use chrono::{NaiveDateTime, NaiveTime, TimeDelta};

use crate::{daemon::storage::entities::Counter, notification::Notification};

/// Parameters of a single reminder loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderSpec {
    pub counter: Counter,
    pub goal: u32,
    /// Time of day the grid of reminders is aligned to.
    pub anchor: NaiveTime,
    pub interval: TimeDelta,
}

fn default_anchor() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 15, 0).expect("09:15 is a valid time")
}

impl ReminderSpec {
    pub fn water() -> Self {
        Self {
            counter: Counter::WaterBottles,
            goal: Counter::WaterBottles.goal(),
            anchor: default_anchor(),
            interval: TimeDelta::minutes(75),
        }
    }

    pub fn sunscreen() -> Self {
        Self {
            counter: Counter::SunscreenApplications,
            goal: Counter::SunscreenApplications.goal(),
            anchor: default_anchor(),
            interval: TimeDelta::minutes(150),
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![Self::water(), Self::sunscreen()]
    }

    pub fn name(&self) -> &'static str {
        match self.counter {
            Counter::WaterBottles => "water",
            Counter::SunscreenApplications => "sunscreen",
        }
    }

    pub fn next_fire(&self, now: NaiveDateTime) -> NaiveDateTime {
        next_fire(now, self.anchor, self.interval)
    }

    pub fn notification(&self, current: u32) -> Notification {
        let (title, action) = match self.counter {
            Counter::WaterBottles => ("Water reminder", "Time to drink some water!"),
            Counter::SunscreenApplications => ("Sunscreen reminder", "Time to reapply sunscreen!"),
        };
        Notification::new(title, format!("{action} Progress: {current}/{}", self.goal))
    }
}

/// Returns the first point of the grid `anchor + k * interval` (k ≥ 1) that lies strictly after
/// `now`, with the anchor taken on the same day as `now`.
///
/// The grid is recomputed from scratch every time, so a late wake-up snaps back to the grid and
/// any number of missed points collapse into the next one.
pub fn next_fire(now: NaiveDateTime, anchor: NaiveTime, interval: TimeDelta) -> NaiveDateTime {
    let anchor = now.date().and_time(anchor);
    if now <= anchor {
        return anchor + interval;
    }

    let interval_ms = interval.num_milliseconds().max(1);
    let passed = (now - anchor).num_milliseconds() / interval_ms;
    anchor + TimeDelta::milliseconds(interval_ms * (passed + 1))
}
