//! Cached game aggregates between sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, instrument};

use crate::game::{Game, GameId};

#[derive(Debug, Clone)]
struct Entry {
    game: Game,
    version: i64,
}

/// Last committed aggregate of each recently used game, with its version.
#[derive(Debug, Clone, Default)]
pub struct GameCache {
    entries: Arc<Mutex<HashMap<GameId, Entry>>>,
}

impl GameCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the cached game if it is at `version`.
    #[instrument(skip(self))]
    pub fn get(&self, game_id: &str, version: i64) -> Option<Game> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(game_id) {
            Some(entry) if entry.version == version => Some(entry.game.clone()),
            Some(entry) => {
                debug!(cached = entry.version, "Cached game is stale");
                None
            }
            None => None,
        }
    }

    /// Stores a committed game.
    #[instrument(skip(self, game), fields(game_id = %game.id()))]
    pub fn put(&self, game: Game, version: i64) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(game.id().clone(), Entry { game, version });
    }

    /// Drops a game from the cache.
    #[instrument(skip(self))]
    pub fn evict(&self, game_id: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(game_id).is_some() {
            debug!("Cached game evicted");
        }
    }

    /// Returns true if the game is cached at any version.
    pub fn contains(&self, game_id: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(game_id)
    }
}
