//! Errors raised by game stores.

use derive_more::{Display, Error};
use tracing::instrument;

/// A failed store operation, tagged with the store code that raised it.
///
/// The session layer maps every `DbError` to a persistence error and never
/// retries.
#[derive(Debug, Clone, Display, Error)]
#[display("Store error: {} at {}:{}", message, file, line)]
pub struct DbError {
    /// What went wrong.
    pub message: String,
    /// Line that raised it.
    pub line: u32,
    /// File that raised it.
    pub file: &'static str,
}

impl DbError {
    /// Creates a store error located at the caller.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// A commit whose expected version lost the race to another writer.
    #[track_caller]
    pub fn version_conflict(game_id: &str, expected: i64, found: i64) -> Self {
        Self::new(format!(
            "Version conflict on '{}': expected {}, found {}",
            game_id, expected, found
        ))
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::new(format!("Query failed: {}", err))
    }
}

impl From<diesel::ConnectionError> for DbError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(format!("Connection failed: {}", err))
    }
}

impl From<serde_json::Error> for DbError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("Game state (de)serialization failed: {}", err))
    }
}
