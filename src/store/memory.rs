//! In-process store for tests and single-process play.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, instrument, warn};

use crate::decision::{DecisionId, DecisionRequest};
use crate::game::{Game, GameId};
use crate::store::{DbError, GameStore, StoredGame};

#[derive(Debug, Default)]
struct Tables {
    games: HashMap<GameId, StoredGame>,
    decisions: HashMap<GameId, Vec<DecisionRequest>>,
}

/// Game store held in memory.
///
/// Clones share the same tables, so a clone handed to a second
/// [`SessionManager`](crate::SessionManager) behaves like a process restart
/// against the same database.
#[derive(Debug, Clone, Default)]
pub struct MemoryGameStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryGameStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating in-memory game store");
        Self::default()
    }
}

impl GameStore for MemoryGameStore {
    #[instrument(skip(self, game), fields(game_id = %game.id()))]
    fn create_game(&self, game: &Game) -> Result<i64, DbError> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        if tables.games.contains_key(game.id()) {
            warn!("Game already exists");
            return Err(DbError::new(format!("Game '{}' already exists", game.id())));
        }
        tables.games.insert(
            game.id().clone(),
            StoredGame {
                game: game.clone(),
                version: 1,
            },
        );
        info!("Game created");
        Ok(1)
    }

    #[instrument(skip(self))]
    fn load_game(&self, id: &str) -> Result<Option<StoredGame>, DbError> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.games.get(id).cloned())
    }

    #[instrument(skip(self))]
    fn game_version(&self, id: &str) -> Result<Option<i64>, DbError> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.games.get(id).map(|stored| stored.version))
    }

    #[instrument(skip(self), fields(decision_id = %id))]
    fn load_decision(&self, id: &DecisionId) -> Result<Option<DecisionRequest>, DbError> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tables
            .decisions
            .values()
            .flatten()
            .find(|r| r.id() == id)
            .cloned())
    }

    #[instrument(skip(self))]
    fn pending_decisions(&self, game_id: &str) -> Result<Vec<DecisionRequest>, DbError> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.decisions.get(game_id).cloned().unwrap_or_default())
    }

    #[instrument(skip(self, game, requests), fields(game_id = %game.id(), requests = requests.len()))]
    fn commit(
        &self,
        game: &Game,
        expected_version: i64,
        requests: &[DecisionRequest],
    ) -> Result<i64, DbError> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = tables
            .games
            .get_mut(game.id())
            .ok_or_else(|| DbError::new(format!("Unknown game '{}'", game.id())))?;
        if stored.version != expected_version {
            warn!(
                expected = expected_version,
                found = stored.version,
                "Version conflict"
            );
            return Err(DbError::version_conflict(
                game.id().as_str(),
                expected_version,
                stored.version,
            ));
        }
        stored.game = game.clone();
        stored.version += 1;
        let version = stored.version;
        tables
            .decisions
            .insert(game.id().clone(), requests.to_vec());
        debug!(version, "Game committed");
        Ok(version)
    }
}
