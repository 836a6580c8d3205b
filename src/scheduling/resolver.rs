use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::availability::{is_available, timeslots_for_day, timeslots_in_span, validate_alignment};
use super::day_finder::{days_with_time, days_with_window};
use super::SchedulingError;
use crate::db::ScheduleStore;
use crate::models::{TemporalRequest, TimeWindow};

/// What resolving a request against the schedule produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Candidates {
    /// A single instant and whether it can be booked.
    Exact { at: NaiveDateTime, available: bool },
    /// Slots to pick a time from.
    Times { slots: Vec<NaiveDateTime> },
    /// Slots at one fixed time of day, to pick a day from.
    Days {
        time: NaiveTime,
        slots: Vec<NaiveDateTime>,
    },
}

impl Candidates {
    /// True when nothing can be offered.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Exact { available, .. } => !available,
            Self::Times { slots } | Self::Days { slots, .. } => slots.is_empty(),
        }
    }
}

/// Dispatch a normalized request to the matching schedule query.
///
/// Misaligned pinned times and past days are rejected before any lookup.
pub fn resolve<S: ScheduleStore + ?Sized>(
    store: &S,
    category: &str,
    request: &TemporalRequest,
    today: NaiveDate,
) -> Result<Candidates, SchedulingError> {
    if let Some(time) = request.pinned_time() {
        validate_alignment(time)?;
    }

    let candidates = match request {
        TemporalRequest::Exact { at } => {
            reject_past(at.date(), today)?;
            Candidates::Exact {
                at: *at,
                available: is_available(store, category, *at)?,
            }
        }
        TemporalRequest::DayOpenTime { day } => {
            reject_past(*day, today)?;
            Candidates::Times {
                slots: timeslots_for_day(store, category, *day, None)?,
            }
        }
        TemporalRequest::DayWindow { day, window } => {
            reject_past(*day, today)?;
            Candidates::Times {
                slots: timeslots_for_day(store, category, *day, Some(*window))?,
            }
        }
        TemporalRequest::TimeOpenDay { time } => Candidates::Days {
            time: *time,
            slots: days_with_time(store, category, *time, today)?,
        },
        TemporalRequest::TimeWindow { window } => Candidates::Times {
            slots: days_with_window(store, category, *window, today)?,
        },
        TemporalRequest::DaysAtTime { days, time } => {
            reject_past(days.end, today)?;
            let window = TimeWindow::single_slot(*time);
            Candidates::Days {
                time: *time,
                slots: timeslots_in_span(store, category, *days, Some(window), today)?,
            }
        }
        TemporalRequest::DayAndTimeWindow { days, window } => {
            reject_past(days.end, today)?;
            Candidates::Times {
                slots: timeslots_in_span(store, category, *days, *window, today)?,
            }
        }
    };

    tracing::debug!(category, empty = candidates.is_empty(), "Resolved request");
    Ok(candidates)
}

fn reject_past(day: NaiveDate, today: NaiveDate) -> Result<(), SchedulingError> {
    if day < today {
        Err(SchedulingError::PastDate)
    } else {
        Ok(())
    }
}
