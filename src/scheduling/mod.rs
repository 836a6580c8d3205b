//! Date/time resolution against the practitioner schedule.
//!
//! Pipeline for one request:
//! 1. [`normalizer`] reduces the recognized temporal entities to a single
//!    [`TemporalRequest`](crate::models::TemporalRequest), using
//!    [`range_cleaner`] to drop past ranges.
//! 2. [`availability`] answers day-anchored shapes (exact instant, one day,
//!    a span of days) and performs bookings.
//! 3. [`day_finder`] answers time-anchored shapes (a time or time window on
//!    any upcoming day).
//!
//! [`resolver::resolve`] dispatches each request shape to the right query.
//!
//! All functions take "today" explicitly; [`Clock`] supplies it at the edge.

pub mod availability;
pub mod category;
pub mod day_finder;
pub mod normalizer;
pub mod parse;
pub mod range_cleaner;
pub mod resolver;

pub use availability::{
    book_slot, is_available, timeslots_for_day, timeslots_in_span, validate_alignment,
};
pub use category::{match_category, CategoryMatch};
pub use day_finder::{days_with_time, days_with_window};
pub use normalizer::normalize;
pub use range_cleaner::clean_date_ranges;
pub use resolver::{resolve, Candidates};

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::db::DatabaseError;

/// Recoverable and unrecoverable failures of the scheduling core.
///
/// Everything except `Database` maps to a clarification prompt in the
/// dialog layer.
#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("No date or time was recognized")]
    MissingEntity,
    #[error("The requested date is in the past")]
    PastDate,
    #[error("{0} is not on a 30-minute boundary")]
    MisalignedTime(NaiveTime),
    #[error("The time range {start} to {end} crosses midnight")]
    TimeRangeCrossesMidnight { start: NaiveTime, end: NaiveTime },
    #[error("The slot at {0} is not available")]
    SlotUnavailable(NaiveDateTime),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Source of "today" for past-date filtering.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_returns_its_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(FixedClock(date).today(), date);
    }

    #[test]
    fn misaligned_error_names_the_time() {
        let err = SchedulingError::MisalignedTime(NaiveTime::from_hms_opt(14, 15, 0).unwrap());
        assert_eq!(err.to_string(), "14:15:00 is not on a 30-minute boundary");
    }
}
