//! Natural-language-understanding seam.
//!
//! Entity extraction is owned by an external recognizer. This module holds
//! its payload types, intent routing, and the [`EntityRecognizer`] trait with
//! an HTTP implementation and a mock.

pub mod entities;
pub mod intent;
pub mod luis;

pub use entities::{
    find_entity, Entity, IntentScore, RecognizerResponse, Resolution, ResolutionValue,
    TemporalEntities,
};
pub use intent::{classify_intent, Intent};
pub use luis::{LuisClient, MockRecognizer};

/// Errors from recognizer calls.
#[derive(Debug, thiserror::Error)]
pub enum NluError {
    #[error("Cannot reach recognizer at {0}")]
    Connection(String),
    #[error("HTTP client error: {0}")]
    HttpClient(String),
    #[error("Recognizer returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Cannot parse recognizer response: {0}")]
    ResponseParsing(String),
}

/// Extracts intents and entities from free text.
pub trait EntityRecognizer: Send + Sync {
    fn recognize(&self, utterance: &str) -> Result<RecognizerResponse, NluError>;
}
