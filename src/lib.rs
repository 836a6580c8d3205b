//! Availability resolution and booking for a conversational doctor-appointment bot.
//!
//! The bot framework owns the turn loop, the NLU service owns entity
//! extraction. This crate owns everything in between: normalizing the
//! recognized temporal entities into one request shape, resolving it against
//! a practitioner schedule, and booking the chosen slot.

pub mod config;
pub mod models;
pub mod db;
pub mod nlu; // Recognizer payloads + HTTP client
pub mod scheduling; // Normalizer, range cleaner, availability, day finder
pub mod session;
pub mod dialog; // Turn orchestration over the scheduling core

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Honors `RUST_LOG`, falling back to [`config::default_log_filter`].
/// Calling it more than once is harmless.
pub fn init_tracing() {
    let result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    if result.is_ok() {
        tracing::info!("{} v{} tracing initialized", config::APP_NAME, config::APP_VERSION);
    }
}
