//! Day-anchored availability queries and booking.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::SchedulingError;
use crate::db::ScheduleStore;
use crate::models::{is_increment_of_thirty, BookingOutcome, DateSpan, Slot, SlotKey, SlotState, TimeWindow};

/// Rejects times off the 30-minute grid before any lookup.
pub fn validate_alignment(time: NaiveTime) -> Result<(), SchedulingError> {
    if is_increment_of_thirty(time) {
        Ok(())
    } else {
        Err(SchedulingError::MisalignedTime(time))
    }
}

/// Whether the slot starting at `at` is offered and still available.
///
/// Booked and not-offered slots both answer `false`.
pub fn is_available<S: ScheduleStore + ?Sized>(
    store: &S,
    category: &str,
    at: NaiveDateTime,
) -> Result<bool, SchedulingError> {
    let state = store.slot_state(&SlotKey::at(category, at))?;
    Ok(state == Some(SlotState::Available))
}

/// Available slot start times on `day`, optionally limited to `window`.
pub fn timeslots_for_day<S: ScheduleStore + ?Sized>(
    store: &S,
    category: &str,
    day: NaiveDate,
    window: Option<TimeWindow>,
) -> Result<Vec<NaiveDateTime>, SchedulingError> {
    let slots = store.slots_on(category, day)?;
    Ok(available_in_window(slots, window))
}

/// Available slot start times on every day of `days` from `today` onward,
/// optionally limited to `window` on each day.
pub fn timeslots_in_span<S: ScheduleStore + ?Sized>(
    store: &S,
    category: &str,
    days: DateSpan,
    window: Option<TimeWindow>,
    today: NaiveDate,
) -> Result<Vec<NaiveDateTime>, SchedulingError> {
    let Some(days) = days.from_today(today) else {
        return Ok(Vec::new());
    };
    let slots = store.slots_between(category, days.start, Some(days.end))?;
    Ok(available_in_window(slots, window))
}

/// Books the slot starting at `at`.
///
/// Fails with `SlotUnavailable` when the slot is already booked or not
/// offered; the store guarantees a single winner under contention.
pub fn book_slot<S: ScheduleStore + ?Sized>(
    store: &S,
    category: &str,
    at: NaiveDateTime,
) -> Result<(), SchedulingError> {
    validate_alignment(at.time())?;
    match store.book(&SlotKey::at(category, at))? {
        BookingOutcome::Booked => {
            tracing::info!(category, at = %at, "Slot booked");
            Ok(())
        }
        outcome => {
            tracing::info!(category, at = %at, outcome = ?outcome, "Slot could not be booked");
            Err(SchedulingError::SlotUnavailable(at))
        }
    }
}

/// Keeps available slots inside `window`, sorted by start time.
pub(crate) fn available_in_window(slots: Vec<Slot>, window: Option<TimeWindow>) -> Vec<NaiveDateTime> {
    let mut times: Vec<NaiveDateTime> = slots
        .into_iter()
        .filter(Slot::is_available)
        .filter(|slot| window.map_or(true, |w| w.contains(slot.key.time)))
        .map(|slot| slot.starts_at())
        .collect();
    times.sort();
    times
}
