use chrono::NaiveDate;

use super::parse::parse_date;
use crate::models::DateSpan;
use crate::nlu::ResolutionValue;

/// Drop resolution ranges that lie entirely before `today`.
///
/// A lone candidate is returned untouched: the recognizer had no
/// alternative to offer. With several candidates, a range survives iff its
/// upper boundary (`end`, else `value`) parses and falls on or after
/// `today`. Unparsable boundaries count as past.
pub fn clean_date_ranges(values: &[ResolutionValue], today: NaiveDate) -> Vec<ResolutionValue> {
    if values.len() <= 1 {
        return values.to_vec();
    }

    values
        .iter()
        .filter(|value| match value.upper().and_then(parse_date) {
            Some(end) => end >= today,
            None => {
                tracing::warn!(value = ?value, "Dropping range with unparsable boundary");
                false
            }
        })
        .cloned()
        .collect()
}

/// Calendar-day span covered by a range value, `None` if either boundary
/// does not parse.
pub fn date_span(value: &ResolutionValue) -> Option<DateSpan> {
    let start = value.lower().and_then(parse_date)?;
    let end = value.upper().and_then(parse_date)?;
    Some(DateSpan::new(start, end))
}
