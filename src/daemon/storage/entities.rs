use std::fmt::Display;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Bounded counters tracked for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    WaterBottles,
    SunscreenApplications,
}

impl Counter {
    pub const ALL: [Counter; 2] = [Counter::WaterBottles, Counter::SunscreenApplications];

    /// Daily goal, which is also the maximum value the counter can reach.
    pub const fn goal(self) -> u32 {
        match self {
            Counter::WaterBottles => 6,
            Counter::SunscreenApplications => 3,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Counter::WaterBottles => "Water bottles",
            Counter::SunscreenApplications => "Sunscreen",
        }
    }
}

/// Record of a single day. This is the only thing that is ever saved to the disk, and a new day
/// simply overwrites the previous one.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub creatine_taken: bool,
    pub water_bottles: u32,
    // Older files only tracked creatine and water.
    #[serde(default)]
    pub sunscreen_applications: u32,
}

impl DailyRecord {
    pub fn new_for(date: NaiveDate) -> Self {
        Self {
            date,
            creatine_taken: false,
            water_bottles: 0,
            sunscreen_applications: 0,
        }
    }

    pub fn is_stale(&self, today: NaiveDate) -> bool {
        self.date != today
    }

    pub fn count(&self, counter: Counter) -> u32 {
        match counter {
            Counter::WaterBottles => self.water_bottles,
            Counter::SunscreenApplications => self.sunscreen_applications,
        }
    }

    fn count_mut(&mut self, counter: Counter) -> &mut u32 {
        match counter {
            Counter::WaterBottles => &mut self.water_bottles,
            Counter::SunscreenApplications => &mut self.sunscreen_applications,
        }
    }

    /// Increments `counter` unless it already reached `max`. Returns whether the value changed.
    pub fn increment(&mut self, counter: Counter, max: u32) -> bool {
        let value = self.count_mut(counter);
        if *value < max {
            *value += 1;
            true
        } else {
            false
        }
    }

    pub fn goal_reached(&self, counter: Counter) -> bool {
        self.count(counter) >= counter.goal()
    }

    /// Brings counters written by hand or by a buggy build back into their allowed range.
    /// Returns whether anything had to be changed.
    pub fn clamp_to_goals(&mut self) -> bool {
        let mut changed = false;
        for counter in Counter::ALL {
            let value = self.count_mut(counter);
            if *value > counter.goal() {
                *value = counter.goal();
                changed = true;
            }
        }
        changed
    }
}

impl Display for DailyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} | creatine: {} | water: {}/{} | sunscreen: {}/{}",
            self.date,
            if self.creatine_taken { "taken" } else { "not taken" },
            self.water_bottles,
            Counter::WaterBottles.goal(),
            self.sunscreen_applications,
            Counter::SunscreenApplications.goal(),
        )
    }
}
