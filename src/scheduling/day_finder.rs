//! Time-anchored queries: which upcoming days offer a given time.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use super::availability::available_in_window;
use super::SchedulingError;
use crate::db::ScheduleStore;
use crate::models::TimeWindow;

/// Every day from `today` onward where the slot at `time` is available.
///
/// Days are compared by date only, so a slot earlier today still counts.
pub fn days_with_time<S: ScheduleStore + ?Sized>(
    store: &S,
    category: &str,
    time: NaiveTime,
    today: NaiveDate,
) -> Result<Vec<NaiveDateTime>, SchedulingError> {
    let slots = store.slots_between(category, today, None)?;
    let key = (time.hour(), time.minute());
    let mut found: Vec<NaiveDateTime> = slots
        .into_iter()
        .filter(|slot| slot.is_available() && (slot.key.time.hour(), slot.key.time.minute()) == key)
        .map(|slot| slot.starts_at())
        .collect();
    found.sort();
    tracing::debug!(category, time = %time, days = found.len(), "Days with time");
    Ok(found)
}

/// Every available (day, time) from `today` onward whose time of day falls
/// in `window`.
pub fn days_with_window<S: ScheduleStore + ?Sized>(
    store: &S,
    category: &str,
    window: TimeWindow,
    today: NaiveDate,
) -> Result<Vec<NaiveDateTime>, SchedulingError> {
    let slots = store.slots_between(category, today, None)?;
    Ok(available_in_window(slots, Some(window)))
}
