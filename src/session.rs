//! Per-conversation dialog state.
//!
//! The conversation framework owns persistence; it sees the session only as
//! an opaque JSON blob keyed by conversation id. [`SessionStore`] is that
//! seam, with an in-memory implementation for tests and single-process use.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::dialog::Menu;
use crate::models::TemporalRequest;
use crate::nlu::TemporalEntities;

// ═══════════════════════════════════════════════════════════
// SchedulingSession
// ═══════════════════════════════════════════════════════════

/// Which answer the dialog expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Awaiting {
    Category,
    DayAndTime,
    ProperTime,
    TimeChoice,
    DayChoice,
    Reason,
}

/// In-progress appointment request of one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulingSession {
    /// Matched practitioner category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Temporal entities recognized before the category was known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<TemporalEntities>,
    /// The normalized request being resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<TemporalRequest>,
    /// The instant the user settled on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested: Option<NaiveDateTime>,
    /// The menu last shown, so a reply can be mapped back to an option.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu: Option<Menu>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awaiting: Option<Awaiting>,
}

impl SchedulingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// No dialog in progress.
    pub fn is_idle(&self) -> bool {
        self.awaiting.is_none()
    }

    /// Forget everything. Booked slots are not affected.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ═══════════════════════════════════════════════════════════
// SessionStore
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Session store lock poisoned")]
    LockPoisoned,
}

/// Per-conversation blob storage.
pub trait SessionStore: Send + Sync {
    fn get(&self, conversation_id: &str) -> Result<Option<serde_json::Value>, SessionError>;
    fn set(&self, conversation_id: &str, blob: serde_json::Value) -> Result<(), SessionError>;
    fn remove(&self, conversation_id: &str) -> Result<(), SessionError>;

    /// Typed load; a missing entry yields a fresh session.
    fn load(&self, conversation_id: &str) -> Result<SchedulingSession, SessionError> {
        match self.get(conversation_id)? {
            Some(blob) => Ok(serde_json::from_value(blob)?),
            None => Ok(SchedulingSession::new()),
        }
    }

    /// Typed save; an idle session removes the entry.
    fn save(&self, conversation_id: &str, session: &SchedulingSession) -> Result<(), SessionError> {
        if session.is_idle() {
            self.remove(conversation_id)
        } else {
            self.set(conversation_id, serde_json::to_value(session)?)
        }
    }
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    blobs: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, conversation_id: &str) -> Result<Option<serde_json::Value>, SessionError> {
        let blobs = self.blobs.read().map_err(|_| SessionError::LockPoisoned)?;
        Ok(blobs.get(conversation_id).cloned())
    }

    fn set(&self, conversation_id: &str, blob: serde_json::Value) -> Result<(), SessionError> {
        let mut blobs = self.blobs.write().map_err(|_| SessionError::LockPoisoned)?;
        blobs.insert(conversation_id.to_string(), blob);
        Ok(())
    }

    fn remove(&self, conversation_id: &str) -> Result<(), SessionError> {
        let mut blobs = self.blobs.write().map_err(|_| SessionError::LockPoisoned)?;
        blobs.remove(conversation_id);
        Ok(())
    }
}
