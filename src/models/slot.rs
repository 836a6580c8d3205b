use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::enums::SlotState;

/// Composite key of one schedulable slot.
///
/// Field order drives the derived `Ord`, so a sorted collection of keys is
/// grouped by category and then chronological.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub category: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl SlotKey {
    /// Slots start on whole minutes; seconds are dropped from `time`.
    pub fn new(category: impl Into<String>, date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            category: category.into(),
            date,
            time: NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time),
        }
    }

    /// Key for the slot starting at `at`.
    pub fn at(category: impl Into<String>, at: NaiveDateTime) -> Self {
        Self::new(category, at.date(), at.time())
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

/// A slot and its current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub key: SlotKey,
    pub state: SlotState,
}

impl Slot {
    pub fn is_available(&self) -> bool {
        self.state == SlotState::Available
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.key.starts_at()
    }
}

/// Result of the one-way `available → booked` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingOutcome {
    /// The slot was available and is now booked.
    Booked,
    /// The slot exists but was already booked.
    AlreadyBooked,
    /// The grid has no such slot.
    NotOffered,
}

impl BookingOutcome {
    pub fn is_booked(&self) -> bool {
        matches!(self, Self::Booked)
    }
}
