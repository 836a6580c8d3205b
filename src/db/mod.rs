pub mod memory;
pub mod seed;
pub mod sqlite;
pub mod store;

pub use memory::InMemoryScheduleStore;
pub use seed::{load_grid, load_grid_str};
pub use sqlite::SqliteScheduleStore;
pub use store::ScheduleStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Invalid stored {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Malformed schedule grid at {path}: {reason}")]
    MalformedGrid { path: String, reason: String },

    #[error("Schedule grid is not valid JSON: {0}")]
    GridJson(#[from] serde_json::Error),

    #[error("Internal lock error")]
    LockPoisoned,
}
