//! Reduction of recognized temporal entities to one [`TemporalRequest`].
//!
//! Precedence when several entity kinds are present, first match wins:
//!
//! | Entities present                 | Request shape        |
//! |----------------------------------|----------------------|
//! | date-time                        | `Exact`              |
//! | date-time-range, one day         | `DayWindow`          |
//! | date-time-range, several days    | `DayAndTimeWindow`   |
//! | date-range + time-range          | `DayAndTimeWindow`   |
//! | date-range + time                | `DaysAtTime`         |
//! | date-range                       | `DayAndTimeWindow`   |
//! | date + time-range                | `DayWindow`          |
//! | date + time                      | `Exact`              |
//! | date                             | `DayOpenTime`        |
//! | time                             | `TimeOpenDay`        |
//! | time-range                       | `TimeWindow`         |
//!
//! A single-valued entity whose values do not parse is treated as absent.
//! Range entities go through the range cleaner first; when it leaves nothing
//! the request is in the past.
//!
//! A time-range whose end is earlier than its start crosses midnight and is
//! rejected. A date-time-range over several days whose end time is earlier
//! than its start time keeps whole days.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::parse::{parse_date, parse_date_time, parse_time};
use super::range_cleaner::{clean_date_ranges, date_span};
use super::SchedulingError;
use crate::models::{DateSpan, TemporalRequest, TimeWindow};
use crate::nlu::{Entity, TemporalEntities};

pub fn normalize(
    entities: &TemporalEntities,
    today: NaiveDate,
) -> Result<TemporalRequest, SchedulingError> {
    let request = select(entities, today)?;
    tracing::debug!(request = ?request, "Normalized temporal request");
    Ok(request)
}

fn select(entities: &TemporalEntities, today: NaiveDate) -> Result<TemporalRequest, SchedulingError> {
    if let Some(at) = upcoming_date_time(entities.date_time.as_ref(), today)? {
        return Ok(TemporalRequest::Exact { at });
    }

    if let Some((start, end)) = date_time_range(entities.date_time_range.as_ref(), today)? {
        let window = TimeWindow::new(start.time(), end.time());
        return Ok(if start.date() == end.date() {
            TemporalRequest::DayWindow {
                day: start.date(),
                window,
            }
        } else {
            TemporalRequest::DayAndTimeWindow {
                days: DateSpan::new(start.date(), end.date()),
                window: (!window.crosses_midnight()).then_some(window),
            }
        });
    }

    let time_range = first_time_window(entities.time_range.as_ref())?;
    let time = first_time(entities.time.as_ref());

    if let Some(days) = date_range(entities.date_range.as_ref(), today)? {
        return Ok(match (time_range, time) {
            (Some(window), _) => TemporalRequest::DayAndTimeWindow {
                days,
                window: Some(window),
            },
            (None, Some(time)) => TemporalRequest::DaysAtTime { days, time },
            (None, None) => TemporalRequest::DayAndTimeWindow { days, window: None },
        });
    }

    if let Some(day) = upcoming_date(entities.date.as_ref(), today)? {
        return Ok(match (time_range, time) {
            (Some(window), _) => TemporalRequest::DayWindow { day, window },
            (None, Some(time)) => TemporalRequest::Exact {
                at: day.and_time(time),
            },
            (None, None) => TemporalRequest::DayOpenTime { day },
        });
    }

    if let Some(time) = time {
        return Ok(TemporalRequest::TimeOpenDay { time });
    }

    if let Some(window) = time_range {
        return Ok(TemporalRequest::TimeWindow { window });
    }

    Err(SchedulingError::MissingEntity)
}

// ─── Per-entity extraction ────────────────────────────────────────────────────

/// First value on or after `today`. `Ok(None)` when nothing parses,
/// `PastDate` when everything that parses is in the past.
fn first_upcoming<T>(
    parsed: impl Iterator<Item = T>,
    day_of: impl Fn(&T) -> NaiveDate,
    today: NaiveDate,
) -> Result<Option<T>, SchedulingError> {
    let mut saw_past = false;
    for value in parsed {
        if day_of(&value) >= today {
            return Ok(Some(value));
        }
        saw_past = true;
    }
    if saw_past {
        Err(SchedulingError::PastDate)
    } else {
        Ok(None)
    }
}

fn upcoming_date_time(
    entity: Option<&Entity>,
    today: NaiveDate,
) -> Result<Option<NaiveDateTime>, SchedulingError> {
    let Some(entity) = entity else {
        return Ok(None);
    };
    let parsed = entity
        .values()
        .iter()
        .filter_map(|v| v.value.as_deref().and_then(parse_date_time));
    first_upcoming(parsed, NaiveDateTime::date, today)
}

fn upcoming_date(
    entity: Option<&Entity>,
    today: NaiveDate,
) -> Result<Option<NaiveDate>, SchedulingError> {
    let Some(entity) = entity else {
        return Ok(None);
    };
    let parsed = entity
        .values()
        .iter()
        .filter_map(|v| v.value.as_deref().and_then(parse_date));
    first_upcoming(parsed, |day: &NaiveDate| *day, today)
}

fn date_range(
    entity: Option<&Entity>,
    today: NaiveDate,
) -> Result<Option<DateSpan>, SchedulingError> {
    let Some(entity) = entity else {
        return Ok(None);
    };
    let cleaned = clean_date_ranges(entity.values(), today);
    if cleaned.is_empty() && !entity.values().is_empty() {
        return Err(SchedulingError::PastDate);
    }
    let parsed = cleaned.iter().filter_map(date_span);
    first_upcoming(parsed, |span: &DateSpan| span.end, today)
}

fn date_time_range(
    entity: Option<&Entity>,
    today: NaiveDate,
) -> Result<Option<(NaiveDateTime, NaiveDateTime)>, SchedulingError> {
    let Some(entity) = entity else {
        return Ok(None);
    };
    let cleaned = clean_date_ranges(entity.values(), today);
    if cleaned.is_empty() && !entity.values().is_empty() {
        return Err(SchedulingError::PastDate);
    }
    let parsed = cleaned.iter().filter_map(|v| {
        let start = v.start.as_deref().and_then(parse_date_time)?;
        let end = v.end.as_deref().and_then(parse_date_time)?;
        Some(if end < start { (end, start) } else { (start, end) })
    });
    first_upcoming(parsed, |range: &(NaiveDateTime, NaiveDateTime)| range.1.date(), today)
}

fn first_time(entity: Option<&Entity>) -> Option<NaiveTime> {
    entity?
        .values()
        .iter()
        .find_map(|v| v.value.as_deref().and_then(parse_time))
}

fn first_time_window(entity: Option<&Entity>) -> Result<Option<TimeWindow>, SchedulingError> {
    let Some(entity) = entity else {
        return Ok(None);
    };
    let window = entity.values().iter().find_map(|v| {
        let start = v.start.as_deref().and_then(parse_time)?;
        let end = v.end.as_deref().and_then(parse_time)?;
        Some(TimeWindow::new(start, end))
    });
    match window {
        Some(w) if w.crosses_midnight() => Err(SchedulingError::TimeRangeCrossesMidnight {
            start: w.start,
            end: w.end,
        }),
        other => Ok(other),
    }
}
