use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::config::SLOT_INCREMENT_MINUTES;

// ─── Time-of-day window ───────────────────────────────────────────────────────

/// Half-open time-of-day window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Window holding exactly the one slot that starts at `time`.
    ///
    /// A slot starting at the last increment of the day is closed at 23:59:59.
    pub fn single_slot(time: NaiveTime) -> Self {
        let (end, overflow) =
            time.overflowing_add_signed(Duration::minutes(i64::from(SLOT_INCREMENT_MINUTES)));
        let end = if overflow != 0 {
            NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(time)
        } else {
            end
        };
        Self { start: time, end }
    }

    /// Start inclusive, end exclusive, compared by hour and minute.
    pub fn contains(&self, time: NaiveTime) -> bool {
        let key = |t: NaiveTime| (t.hour(), t.minute());
        key(time) >= key(self.start) && key(time) < key(self.end)
    }

    /// True when the window ends before it starts, i.e. crosses midnight.
    pub fn crosses_midnight(&self) -> bool {
        self.end < self.start
    }
}

// ─── Calendar-day span ────────────────────────────────────────────────────────

/// Inclusive span of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    /// Builds a span, swapping the bounds if they arrive reversed.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// Drops the part of the span before `today`. `None` if nothing is left.
    pub fn from_today(&self, today: NaiveDate) -> Option<Self> {
        if self.end < today {
            None
        } else {
            Some(Self {
                start: self.start.max(today),
                end: self.end,
            })
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }

    /// Every day in the span, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

// ─── Normalized request ───────────────────────────────────────────────────────

/// The single shape a user's temporal request is reduced to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemporalRequest {
    /// A fully specified instant.
    Exact { at: NaiveDateTime },
    /// A day with the time left open.
    DayOpenTime { day: NaiveDate },
    /// A time of day with the day left open.
    TimeOpenDay { time: NaiveTime },
    /// One day bounded to a time window.
    DayWindow { day: NaiveDate, window: TimeWindow },
    /// A time window with the day left open.
    TimeWindow { window: TimeWindow },
    /// A span of days at one fixed time of day.
    DaysAtTime { days: DateSpan, time: NaiveTime },
    /// A span of days, optionally bounded to a time window on each.
    DayAndTimeWindow {
        days: DateSpan,
        window: Option<TimeWindow>,
    },
}

impl TemporalRequest {
    /// The time that must sit on the slot grid, if this shape pins one.
    pub fn pinned_time(&self) -> Option<NaiveTime> {
        match self {
            Self::Exact { at } => Some(at.time()),
            Self::TimeOpenDay { time } | Self::DaysAtTime { time, .. } => Some(*time),
            _ => None,
        }
    }

    /// Whether the pinned time (if any) lies on the 30-minute grid.
    pub fn is_aligned(&self) -> bool {
        self.pinned_time().map_or(true, is_increment_of_thirty)
    }

    /// Replaces the pinned time, keeping the rest of the request.
    pub fn with_time(&self, time: NaiveTime) -> Self {
        match self {
            Self::Exact { at } => Self::Exact {
                at: at.date().and_time(time),
            },
            Self::TimeOpenDay { .. } => Self::TimeOpenDay { time },
            Self::DaysAtTime { days, .. } => Self::DaysAtTime { days: *days, time },
            other => other.clone(),
        }
    }
}

/// True when the time falls exactly on the 30-minute grid, seconds included.
pub fn is_increment_of_thirty(time: NaiveTime) -> bool {
    time.minute() % SLOT_INCREMENT_MINUTES == 0 && time.second() == 0 && time.nanosecond() == 0
}
