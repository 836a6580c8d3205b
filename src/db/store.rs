//! Schedule storage contract.
//!
//! The grid is a flat map from [`SlotKey`] (category, day, time of day) to
//! [`SlotState`]. A key that is absent means the slot is not offered, which
//! is distinct from a slot that exists and is booked.

use chrono::NaiveDate;

use super::DatabaseError;
use crate::models::{BookingOutcome, Slot, SlotKey, SlotState};

/// Storage backend for practitioner schedules.
///
/// Implementations must make [`ScheduleStore::book`] atomic: when several
/// conversations race for the same slot, exactly one observes
/// [`BookingOutcome::Booked`].
pub trait ScheduleStore: Send + Sync {
    /// State of one slot, `None` when the grid does not offer it.
    fn slot_state(&self, key: &SlotKey) -> Result<Option<SlotState>, DatabaseError>;

    /// All slots of `category` from `from` through `to` (inclusive), or
    /// through the end of the grid when `to` is `None`. Chronological order.
    fn slots_between(
        &self,
        category: &str,
        from: NaiveDate,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Slot>, DatabaseError>;

    /// Inserts or overwrites a slot. Used to seed the grid.
    fn insert_slot(&self, key: SlotKey, state: SlotState) -> Result<(), DatabaseError>;

    /// The one-way `available → booked` transition.
    ///
    /// There is no inverse: abandoning a conversation does not
    /// release a slot.
    fn book(&self, key: &SlotKey) -> Result<BookingOutcome, DatabaseError>;

    /// Categories that have at least one slot, sorted.
    fn categories(&self) -> Result<Vec<String>, DatabaseError>;

    /// Slots of `category` on a single day.
    fn slots_on(&self, category: &str, day: NaiveDate) -> Result<Vec<Slot>, DatabaseError> {
        self.slots_between(category, day, Some(day))
    }
}
