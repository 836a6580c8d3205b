//! In-memory schedule store for tests, demos, and single-process deployments.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use chrono::{NaiveDate, NaiveTime};

use super::store::ScheduleStore;
use super::DatabaseError;
use crate::models::{BookingOutcome, Slot, SlotKey, SlotState};

/// Schedule grid held in a `BTreeMap` behind an `RwLock`.
///
/// Reads share the lock; `book` takes the write lock for the whole
/// check-and-set, so concurrent bookings serialize.
#[derive(Debug, Default)]
pub struct InMemoryScheduleStore {
    slots: RwLock<BTreeMap<SlotKey, SlotState>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots in the grid, in any state.
    pub fn len(&self) -> usize {
        self.slots.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScheduleStore for InMemoryScheduleStore {
    fn slot_state(&self, key: &SlotKey) -> Result<Option<SlotState>, DatabaseError> {
        let slots = self.slots.read().map_err(|_| DatabaseError::LockPoisoned)?;
        Ok(slots.get(key).copied())
    }

    fn slots_between(
        &self,
        category: &str,
        from: NaiveDate,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Slot>, DatabaseError> {
        let slots = self.slots.read().map_err(|_| DatabaseError::LockPoisoned)?;
        let lower = SlotKey::new(category, from, NaiveTime::MIN);

        Ok(slots
            .range(lower..)
            .take_while(|(key, _)| key.category == category && to.map_or(true, |to| key.date <= to))
            .map(|(key, state)| Slot {
                key: key.clone(),
                state: *state,
            })
            .collect())
    }

    fn insert_slot(&self, key: SlotKey, state: SlotState) -> Result<(), DatabaseError> {
        let mut slots = self.slots.write().map_err(|_| DatabaseError::LockPoisoned)?;
        slots.insert(key, state);
        Ok(())
    }

    fn book(&self, key: &SlotKey) -> Result<BookingOutcome, DatabaseError> {
        let mut slots = self.slots.write().map_err(|_| DatabaseError::LockPoisoned)?;
        let outcome = match slots.get_mut(key) {
            None => BookingOutcome::NotOffered,
            Some(SlotState::Booked) => BookingOutcome::AlreadyBooked,
            Some(state) => {
                *state = SlotState::Booked;
                BookingOutcome::Booked
            }
        };
        tracing::debug!(category = %key.category, at = %key.starts_at(), ?outcome, "Booking attempt");
        Ok(outcome)
    }

    fn categories(&self) -> Result<Vec<String>, DatabaseError> {
        let slots = self.slots.read().map_err(|_| DatabaseError::LockPoisoned)?;
        let unique: BTreeSet<&str> = slots.keys().map(|k| k.category.as_str()).collect();
        Ok(unique.into_iter().map(String::from).collect())
    }
}
