//! Non-reentrant, fail-fast guard keyed by game id.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, instrument, warn};

use crate::EngineError;
use crate::game::GameId;

/// Tracks which games currently have a session running.
#[derive(Debug, Clone, Default)]
pub struct GameGuard {
    held: Arc<Mutex<HashSet<GameId>>>,
}

impl GameGuard {
    /// Creates a guard with nothing held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `game_id` without waiting.
    ///
    /// # Errors
    ///
    /// Returns a busy error if a session already holds the game.
    #[instrument(skip(self))]
    pub fn try_acquire(&self, game_id: &str) -> Result<GuardTicket, EngineError> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(game_id.to_string()) {
            warn!("Game is busy");
            return Err(EngineError::busy(game_id));
        }
        debug!("Guard acquired");
        Ok(GuardTicket {
            held: Arc::clone(&self.held),
            game_id: game_id.to_string(),
        })
    }

    /// Returns true if a session holds `game_id`.
    pub fn is_held(&self, game_id: &str) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(game_id)
    }
}

/// Releases the game when dropped, including on error paths.
#[derive(Debug)]
pub struct GuardTicket {
    held: Arc<Mutex<HashSet<GameId>>>,
    game_id: GameId,
}

impl GuardTicket {
    /// The guarded game.
    pub fn game_id(&self) -> &str {
        &self.game_id
    }
}

impl Drop for GuardTicket {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.game_id);
        debug!(game_id = %self.game_id, "Guard released");
    }
}
