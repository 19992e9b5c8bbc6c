//! Engine error types.

use derive_more::{Display, Error};
use tracing::instrument;

use crate::config::ConfigError;
use crate::store::DbError;

/// Category of an [`EngineError`], deciding how a guarded session reacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// Player input was rejected (expired button, wrong requester, illegal choice).
    ///
    /// Nothing is mutated and the cached game stays valid.
    #[display("input")]
    Input,
    /// Another session currently holds the game's guard.
    #[display("busy")]
    Busy,
    /// A rules-engine contract was broken; the cached game is evicted.
    #[display("invariant")]
    Invariant,
    /// The commit did not go through; state may not have saved.
    #[display("persistence")]
    Persistence,
    /// Configuration or scenario problem.
    #[display("config")]
    Config,
}

/// Engine error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{} error: {} at {}:{}", kind, message, file, line)]
pub struct EngineError {
    /// Error category.
    pub kind: ErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl EngineError {
    /// Creates a new engine error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Rejected player input.
    #[track_caller]
    pub fn input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Input, message)
    }

    /// Broken engine contract.
    #[track_caller]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invariant, message)
    }

    /// Guard contention.
    #[track_caller]
    pub fn busy(game_id: &str) -> Self {
        Self::new(
            ErrorKind::Busy,
            format!("Game '{}' is busy, please retry", game_id),
        )
    }

    /// Commit failure.
    #[track_caller]
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Persistence, message)
    }

    /// Returns true if this error came from rejected player input.
    pub fn is_input(&self) -> bool {
        self.kind == ErrorKind::Input
    }

    /// Message suitable for showing to the player who triggered the session.
    ///
    /// Invariant violations are reported to the operator log, so the player
    /// only sees a generic notice.
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::Input | ErrorKind::Config => self.message.clone(),
            ErrorKind::Busy => "The game is busy right now, try again in a moment.".to_string(),
            ErrorKind::Invariant => {
                "Something went wrong resolving that action. An operator has been notified."
                    .to_string()
            }
            ErrorKind::Persistence => {
                "The game state may not have saved. Check the board and retry if needed."
                    .to_string()
            }
        }
    }
}

impl From<DbError> for EngineError {
    #[track_caller]
    fn from(err: DbError) -> Self {
        Self::persistence(err.to_string())
    }
}

impl From<ConfigError> for EngineError {
    #[track_caller]
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorKind::Config, err.message)
    }
}

impl From<serde_json::Error> for EngineError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::persistence(format!("Serialization error: {}", err))
    }
}
