//! Inbound commands issued by the current-turn player.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::EngineError;
use crate::event::{EventId, EventKind, ProductionChoiceEvent};
use crate::game::{Game, PlayerId};
use crate::movement::MovementPlan;
use crate::production::production_candidates;
use crate::provider::ProviderRegistry;

/// A typed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(tag = "command", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    /// Start choosing planets to produce on.
    Produce,
    /// Start planning a movement with a held ability.
    Move {
        /// Movement ability key.
        ability: String,
    },
    /// End the turn.
    EndTurn,
}

impl Command {
    /// Validates the command and pushes the event it starts.
    ///
    /// The caller drains the stack afterwards.
    ///
    /// # Errors
    ///
    /// Returns an input error when the game is over, `player` has been
    /// eliminated, it is not their turn, events are still pending, or the
    /// command itself is not allowed.
    #[instrument(skip(self, game, registry), fields(game_id = %game.id(), command = %self, player = %player))]
    pub fn execute(
        &self,
        game: &mut Game,
        registry: &ProviderRegistry,
        player: PlayerId,
    ) -> Result<EventId, EngineError> {
        if !game.is_in_progress() {
            return Err(EngineError::input("The game is over"));
        }
        if !game.is_participant(player) {
            return Err(EngineError::input("You are not playing in this game"));
        }
        if *game.player(player)?.eliminated() {
            return Err(EngineError::input("You have been eliminated"));
        }
        if game.current_player() != player {
            return Err(EngineError::input(format!(
                "It is {}'s turn",
                game.name_of(game.current_player())
            )));
        }
        if !game.stack().is_empty() {
            return Err(EngineError::input(
                "Finish the pending choices before starting something new",
            ));
        }

        let kind = match self {
            Command::Produce => {
                if *game.player(player)?.produced_this_turn() {
                    return Err(EngineError::input("You already produced this turn"));
                }
                if production_candidates(game, player).is_empty() {
                    return Err(EngineError::input("None of your planets can produce"));
                }
                game.player_mut(player)?.produced_this_turn = true;
                EventKind::ProductionChoice(ProductionChoiceEvent {
                    player,
                    produced: Vec::new(),
                })
            }
            Command::Move { ability } => {
                let seat = game.player(player)?;
                if !seat.has_ability(ability) {
                    return Err(EngineError::input(format!("You do not have {}", ability)));
                }
                let config = registry.movement_config(ability).ok_or_else(|| {
                    EngineError::input(format!("{} is not a movement ability", ability))
                })?;
                if config.once_per_turn() && seat.used_this_turn().contains(ability) {
                    return Err(EngineError::input(format!(
                        "{} was already used this turn",
                        ability
                    )));
                }
                if let Some(budget) = config.budgets().find(|b| seat.budget(*b) == 0) {
                    return Err(EngineError::input(format!("No {} left this turn", budget)));
                }
                let mut plan = MovementPlan::new(player, ability.clone(), config);
                plan.advance(game)?;
                EventKind::MovementPlanning(plan)
            }
            Command::EndTurn => EventKind::EndTurn { player },
        };

        let id = game.push_event(kind);
        info!(event_id = %id, "Command accepted");
        Ok(id)
    }
}
