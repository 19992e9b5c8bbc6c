//! Persistence boundary for games and their pending decision requests.
//!
//! A commit overwrites the game aggregate and replaces its whole set of
//! decision requests in one transaction, guarded by an optimistic version.

mod error;
mod memory;
mod models;
mod schema; // Diesel generated schema - internal use only
mod sqlite;

pub use error::DbError;
pub use memory::MemoryGameStore;
pub use sqlite::SqliteGameStore;

use crate::decision::{DecisionId, DecisionRequest};
use crate::game::Game;

/// A game as loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredGame {
    /// The aggregate.
    pub game: Game,
    /// Version the aggregate was committed at.
    pub version: i64,
}

/// Durable storage for games.
pub trait GameStore: std::fmt::Debug + Send + Sync {
    /// Inserts a new game at version 1.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the id is taken or the write fails.
    fn create_game(&self, game: &Game) -> Result<i64, DbError>;

    /// Loads a game with its version.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read or deserialization fails.
    fn load_game(&self, id: &str) -> Result<Option<StoredGame>, DbError>;

    /// Current version of a game without loading it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read fails.
    fn game_version(&self, id: &str) -> Result<Option<i64>, DbError>;

    /// Loads one pending decision request.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read or deserialization fails.
    fn load_decision(&self, id: &DecisionId) -> Result<Option<DecisionRequest>, DbError>;

    /// Every pending decision request of a game, in offer order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the read or deserialization fails.
    fn pending_decisions(&self, game_id: &str) -> Result<Vec<DecisionRequest>, DbError>;

    /// Overwrites the game and replaces its decision requests atomically.
    ///
    /// Returns the new version.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the stored version is not `expected_version`
    /// or the write fails; nothing is written in that case.
    fn commit(
        &self,
        game: &Game,
        expected_version: i64,
        requests: &[DecisionRequest],
    ) -> Result<i64, DbError>;
}
