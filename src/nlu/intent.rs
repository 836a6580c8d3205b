use serde::{Deserialize, Serialize};

use super::entities::RecognizerResponse;
use crate::config::{CANCEL_INTENT_THRESHOLD, HELP_INTENT_THRESHOLD, SCHEDULE_INTENT_THRESHOLD};

/// What the user wants this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ScheduleAppointment,
    Help,
    Cancel,
    /// Nothing recognized above its trigger threshold.
    None,
}

/// Route a recognizer response to an intent.
///
/// Each intent fires only when its score reaches its own threshold; `Hello`
/// is folded into `Help`.
pub fn classify_intent(response: &RecognizerResponse) -> Intent {
    let Some(top) = response.top_intent() else {
        return Intent::None;
    };

    let (intent, threshold) = match top.intent.as_str() {
        "ScheduleAppointment" => (Intent::ScheduleAppointment, SCHEDULE_INTENT_THRESHOLD),
        "Help" | "Hello" => (Intent::Help, HELP_INTENT_THRESHOLD),
        "Cancel" => (Intent::Cancel, CANCEL_INTENT_THRESHOLD),
        _ => return Intent::None,
    };

    if top.score >= threshold {
        intent
    } else {
        tracing::debug!(intent = %top.intent, score = top.score, threshold, "Intent below threshold");
        Intent::None
    }
}
