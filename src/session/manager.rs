//! Guarded sessions: load, mutate a copy, resolve, commit.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::EngineError;
use crate::command::Command;
use crate::config::EngineConfig;
use crate::decision::{DecisionId, DecisionRequest, Prompt};
use crate::game::{Game, GameSetup, GameStatus, PlayerId};
use crate::presentation::PresentationSink;
use crate::provider::ProviderRegistry;
use crate::resolution::{ResolutionReport, Resolver, pending_text};
use crate::session::{GameCache, GameGuard};
use crate::store::GameStore;

/// What a session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// The game after the session.
    pub game: Game,
    /// What resolved, in order.
    pub journal: Vec<String>,
    /// Buttons waiting on players, if the stack suspended.
    pub prompt: Option<Prompt>,
    /// False when the session changed nothing and skipped the commit.
    pub committed: bool,
}

impl SessionOutcome {
    /// Writes the journal, any game-over notice and the prompt to a sink.
    pub fn render(&self, sink: &mut dyn PresentationSink) {
        if !self.journal.is_empty() {
            sink.text(&self.journal.join("\n"));
        }
        if let GameStatus::Finished { winner } = self.game.status() {
            let notice = match winner {
                Some(winner) => format!("Game over: {} wins!", self.game.name_of(*winner)),
                None => "Game over: nobody survived.".to_string(),
            };
            sink.text(&notice);
        }
        if let Some(prompt) = &self.prompt {
            prompt.render(sink);
        }
    }
}

/// Runs guarded sessions against a store.
///
/// One manager is shared by every inbound request of the process.
#[derive(Debug, Clone)]
pub struct SessionManager {
    store: Arc<dyn GameStore>,
    registry: Arc<ProviderRegistry>,
    config: EngineConfig,
    guard: GameGuard,
    cache: GameCache,
}

impl SessionManager {
    /// Creates a session manager.
    #[instrument(skip_all)]
    pub fn new(
        store: Arc<dyn GameStore>,
        registry: Arc<ProviderRegistry>,
        config: EngineConfig,
    ) -> Self {
        info!(providers = registry.len(), "Creating session manager");
        Self {
            store,
            registry,
            config,
            guard: GameGuard::new(),
            cache: GameCache::new(),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Provider registry.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Builds and stores a new game.
    ///
    /// # Errors
    ///
    /// Returns a config error for an invalid setup and a persistence error
    /// if the game cannot be stored.
    #[instrument(skip(self, setup))]
    pub fn create_game(&self, setup: GameSetup) -> Result<Game, EngineError> {
        let game = setup.build(&self.registry)?;
        let version = self.store.create_game(&game)?;
        self.cache.put(game.clone(), version);
        info!(game_id = %game.id(), players = game.players().len(), "Game created");
        Ok(game)
    }

    /// Runs a command for `player` and resolves what it starts.
    ///
    /// # Errors
    ///
    /// Returns an input error if the command is refused, a busy error if
    /// another session holds the game, and invariant or persistence errors
    /// from resolution and commit.
    #[instrument(skip(self), fields(command = %command))]
    pub fn execute(
        &self,
        game_id: &str,
        player: PlayerId,
        command: &Command,
    ) -> Result<SessionOutcome, EngineError> {
        let registry = &*self.registry;
        self.run_guarded(game_id, |game, resolver| {
            command.execute(game, registry, player)?;
            resolver.continue_resolving(game)
        })
    }

    /// Activates a clicked decision request.
    ///
    /// # Errors
    ///
    /// Returns an input error if the request no longer exists or `requester`
    /// may not click it now.
    #[instrument(skip(self), fields(decision_id = %decision_id, requester = %requester))]
    pub fn activate(
        &self,
        decision_id: &DecisionId,
        requester: PlayerId,
    ) -> Result<SessionOutcome, EngineError> {
        let request: DecisionRequest = self
            .store
            .load_decision(decision_id)?
            .ok_or_else(|| EngineError::input("That button has expired"))?;
        let game_id = request.game_id().clone();
        self.run_guarded(&game_id, |game, resolver| {
            resolver.activate(game, &request, requester)
        })
    }

    /// The last committed state of a game.
    ///
    /// # Errors
    ///
    /// Returns an input error for an unknown game.
    #[instrument(skip(self))]
    pub fn snapshot(&self, game_id: &str) -> Result<Game, EngineError> {
        self.load(game_id).map(|(game, _)| game)
    }

    /// Rebuilds the pending prompt of a game from persisted state.
    ///
    /// # Errors
    ///
    /// Returns an input error for an unknown game.
    #[instrument(skip(self))]
    pub fn resurface(&self, game_id: &str) -> Result<Option<Prompt>, EngineError> {
        let (game, _) = self.load(game_id)?;
        let requests = self.store.pending_decisions(game_id)?;
        if requests.is_empty() {
            debug!("Nothing pending");
            return Ok(None);
        }
        let text = pending_text(&game).unwrap_or_default();
        Ok(Some(Prompt::new(
            game.id().clone(),
            *game.epoch(),
            text,
            requests,
        )))
    }

    /// Returns true if the game is in the cache.
    pub fn is_cached(&self, game_id: &str) -> bool {
        self.cache.contains(game_id)
    }

    fn load(&self, game_id: &str) -> Result<(Game, i64), EngineError> {
        let version = self
            .store
            .game_version(game_id)?
            .ok_or_else(|| EngineError::input(format!("No game named '{}'", game_id)))?;
        if let Some(game) = self.cache.get(game_id, version) {
            debug!(version, "Cache hit");
            return Ok((game, version));
        }
        let stored = self
            .store
            .load_game(game_id)?
            .ok_or_else(|| EngineError::input(format!("No game named '{}'", game_id)))?;
        debug!(version = stored.version, "Loaded game from store");
        self.cache.put(stored.game.clone(), stored.version);
        Ok((stored.game, stored.version))
    }

    #[instrument(skip(self, operation))]
    fn run_guarded<F>(&self, game_id: &str, operation: F) -> Result<SessionOutcome, EngineError>
    where
        F: FnOnce(&mut Game, &Resolver<'_>) -> Result<ResolutionReport, EngineError>,
    {
        let _ticket = self.guard.try_acquire(game_id)?;

        let (original, version) = match self.load(game_id) {
            Ok(loaded) => loaded,
            Err(e) => {
                if !e.is_input() {
                    self.cache.evict(game_id);
                }
                return Err(e);
            }
        };

        let mut game = original.clone();
        let resolver = Resolver::new(&self.registry, &self.config);
        let report = match operation(&mut game, &resolver) {
            Ok(report) => report,
            Err(e) if e.is_input() => {
                info!(reason = %e.message, "Input rejected");
                return Err(e);
            }
            Err(e) => {
                error!(error = %e, "Session failed, evicting cached game");
                self.cache.evict(game_id);
                return Err(e);
            }
        };

        let prompt = report.prompt().cloned();
        let committed = if game != original {
            let requests = prompt
                .as_ref()
                .map(|p| p.requests().clone())
                .unwrap_or_default();
            match self.store.commit(&game, version, &requests) {
                Ok(new_version) => {
                    self.cache.put(game.clone(), new_version);
                    info!(version = new_version, steps = report.steps, "Session committed");
                    true
                }
                Err(e) => {
                    error!(error = %e, "Commit failed, evicting cached game");
                    self.cache.evict(game_id);
                    return Err(EngineError::persistence(format!(
                        "The game state may not have saved: {}",
                        e.message
                    )));
                }
            }
        } else {
            warn!("Session changed nothing, skipping commit");
            false
        };

        Ok(SessionOutcome {
            game,
            journal: report.journal,
            prompt,
            committed,
        })
    }
}
