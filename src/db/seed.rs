//! Seeding a store from the nested grid document.
//!
//! The document nests category → year → month → day → hour → minute → state,
//! for example:
//!
//! ```json
//! { "Radiologist": { "2026": { "10": { "20": { "9": { "0": "available", "30": "booked" } } } } } }
//! ```
//!
//! Months are 1-based. Every leaf must be `"available"` or `"booked"`. An
//! hour object without minute children adds nothing: a missing leaf means the
//! slot is not offered.

use chrono::{NaiveDate, NaiveTime};
use serde_json::{Map, Value};

use super::store::ScheduleStore;
use super::DatabaseError;
use crate::models::{SlotKey, SlotState};

/// Parse a grid document and insert every leaf into `store`.
/// Returns the number of slots written.
pub fn load_grid_str<S>(store: &S, json: &str) -> Result<usize, DatabaseError>
where
    S: ScheduleStore + ?Sized,
{
    let doc: Value = serde_json::from_str(json)?;
    load_grid(store, &doc)
}

/// Insert every leaf of an already-parsed grid document into `store`.
pub fn load_grid<S>(store: &S, doc: &Value) -> Result<usize, DatabaseError>
where
    S: ScheduleStore + ?Sized,
{
    let mut written = 0;
    for (category, years) in as_object(doc, "")? {
        for (year, months) in as_object(years, category)? {
            let year_path = format!("{category}/{year}");
            let year_num: i32 = parse_key(year, &year_path)?;
            for (month, days) in as_object(months, &year_path)? {
                let month_path = format!("{year_path}/{month}");
                let month_num: u32 = parse_key(month, &month_path)?;
                for (day, hours) in as_object(days, &month_path)? {
                    let day_path = format!("{month_path}/{day}");
                    let day_num: u32 = parse_key(day, &day_path)?;
                    let date = NaiveDate::from_ymd_opt(year_num, month_num, day_num)
                        .ok_or_else(|| malformed(&day_path, "not a calendar date"))?;

                    for (hour, minutes) in as_object(hours, &day_path)? {
                        let hour_path = format!("{day_path}/{hour}");
                        let hour_num: u32 = parse_key(hour, &hour_path)?;
                        for (minute, state) in as_object(minutes, &hour_path)? {
                            let leaf_path = format!("{hour_path}/{minute}");
                            let minute_num: u32 = parse_key(minute, &leaf_path)?;
                            let time = NaiveTime::from_hms_opt(hour_num, minute_num, 0)
                                .ok_or_else(|| malformed(&leaf_path, "not a time of day"))?;
                            let state = leaf_state(state, &leaf_path)?;

                            store.insert_slot(SlotKey::new(category.as_str(), date, time), state)?;
                            written += 1;
                        }
                    }
                }
            }
        }
    }

    tracing::info!(slots = written, "Schedule grid loaded");
    Ok(written)
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, DatabaseError> {
    value
        .as_object()
        .ok_or_else(|| malformed(path, "expected an object"))
}

fn parse_key<T: std::str::FromStr>(key: &str, path: &str) -> Result<T, DatabaseError> {
    key.trim()
        .parse()
        .map_err(|_| malformed(path, "expected a numeric key"))
}

fn leaf_state(value: &Value, path: &str) -> Result<SlotState, DatabaseError> {
    let raw = value
        .as_str()
        .ok_or_else(|| malformed(path, "expected a slot state string"))?;
    raw.parse()
}

fn malformed(path: &str, reason: &str) -> DatabaseError {
    DatabaseError::MalformedGrid {
        path: if path.is_empty() { "<root>".into() } else { path.into() },
        reason: reason.into(),
    }
}
