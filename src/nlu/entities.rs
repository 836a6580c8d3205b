//! Recognizer payload types.
//!
//! Shapes follow the LUIS v2 endpoint response: a top-scoring intent, the
//! full intent list, and typed entities whose `resolution.values` carry
//! either a single `value` or a `start`/`end` pair.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::EntityKind;

/// One resolution candidate of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timex: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl ResolutionValue {
    /// A single-valued resolution (`date`, `time`, `datetime`).
    pub fn single(value: &str) -> Self {
        Self {
            value: Some(value.to_string()),
            ..Self::default()
        }
    }

    /// A ranged resolution (`daterange`, `timerange`, `datetimerange`).
    pub fn range(start: &str, end: &str) -> Self {
        Self {
            start: Some(start.to_string()),
            end: Some(end.to_string()),
            ..Self::default()
        }
    }

    /// The lower boundary: `start` when present, otherwise `value`.
    pub fn lower(&self) -> Option<&str> {
        self.start.as_deref().or(self.value.as_deref())
    }

    /// The upper boundary: `end` when present, otherwise `value`.
    pub fn upper(&self) -> Option<&str> {
        self.end.as_deref().or(self.value.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    #[serde(default)]
    pub values: Vec<ResolutionValue>,
}

/// An entity extracted from the utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// The matched text span.
    pub entity: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl Entity {
    /// A text-only entity (custom types such as `DoctorType`).
    pub fn text(kind: EntityKind, text: &str) -> Self {
        Self {
            entity: text.to_string(),
            kind: kind.as_str().to_string(),
            start_index: None,
            end_index: None,
            score: None,
            resolution: None,
        }
    }

    /// An entity carrying resolution values.
    pub fn resolved(kind: EntityKind, text: &str, values: Vec<ResolutionValue>) -> Self {
        Self {
            resolution: Some(Resolution { values }),
            ..Self::text(kind, text)
        }
    }

    /// Known kind of this entity, `None` for types this crate does not use.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        EntityKind::from_str(&self.kind).ok()
    }

    /// Resolution values, empty when the recognizer supplied none.
    pub fn values(&self) -> &[ResolutionValue] {
        self.resolution
            .as_ref()
            .map(|r| r.values.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentScore {
    pub intent: String,
    #[serde(default)]
    pub score: f64,
}

/// Full recognizer response for one utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizerResponse {
    #[serde(default)]
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_scoring_intent: Option<IntentScore>,
    #[serde(default)]
    pub intents: Vec<IntentScore>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl RecognizerResponse {
    /// The best intent: `topScoringIntent`, else the highest-scored entry.
    pub fn top_intent(&self) -> Option<&IntentScore> {
        self.top_scoring_intent.as_ref().or_else(|| {
            self.intents
                .iter()
                .max_by(|a, b| a.score.total_cmp(&b.score))
        })
    }

    pub fn find_entity(&self, kind: EntityKind) -> Option<&Entity> {
        find_entity(&self.entities, kind)
    }

    pub fn temporal(&self) -> TemporalEntities {
        TemporalEntities::from_entities(&self.entities)
    }
}

/// First entity of the given kind.
pub fn find_entity(entities: &[Entity], kind: EntityKind) -> Option<&Entity> {
    entities.iter().find(|e| e.kind == kind.as_str())
}

/// The six optional temporal fields of one utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalEntities {
    pub date: Option<Entity>,
    pub time: Option<Entity>,
    pub date_time: Option<Entity>,
    pub date_range: Option<Entity>,
    pub time_range: Option<Entity>,
    pub date_time_range: Option<Entity>,
}

impl TemporalEntities {
    pub fn from_entities(entities: &[Entity]) -> Self {
        let pick = |kind| find_entity(entities, kind).cloned();
        Self {
            date: pick(EntityKind::Date),
            time: pick(EntityKind::Time),
            date_time: pick(EntityKind::DateTime),
            date_range: pick(EntityKind::DateRange),
            time_range: pick(EntityKind::TimeRange),
            date_time_range: pick(EntityKind::DateTimeRange),
        }
    }

    /// True when no temporal information was extracted.
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.time.is_none()
            && self.date_time.is_none()
            && self.date_range.is_none()
            && self.time_range.is_none()
            && self.date_time_range.is_none()
    }
}
