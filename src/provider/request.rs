//! Self-describing resolution requests.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::EngineError;
use crate::event::{CombatSide, EventId, EventKind, StrengthBonus};
use crate::game::{Game, PlanetId, PlayerId};

/// A handler name plus the data it needs.
///
/// Requests are persisted inside decision requests, so they only reference
/// events and planets by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "handler", rename_all = "snake_case")]
pub enum ResolutionRequest {
    /// Adds to the effective output of an open begin-production event.
    AdjustProduction {
        /// Target event.
        event: EventId,
        /// Force delta.
        forces: i32,
        /// Credit delta.
        credits: i32,
    },
    /// Converts forces of an open begin-production event into credits.
    ConvertForces {
        /// Target event.
        event: EventId,
        /// Forces removed.
        forces: u32,
        /// Credits added.
        credits: u32,
    },
    /// Adds a strength bonus to an open movement event.
    AddStrength {
        /// Target event.
        event: EventId,
        /// Side receiving the bonus.
        side: CombatSide,
        /// Bonus amount.
        amount: u32,
        /// Contributing ability.
        source: String,
    },
    /// Sends forces that would exceed capacity to another planet.
    RedirectExcess {
        /// Target event.
        event: EventId,
        /// Receiving planet.
        to: PlanetId,
    },
    /// Gives credits to a player.
    GainCredits {
        /// Receiving player.
        player: PlayerId,
        /// Amount.
        amount: u32,
    },
    /// Provider-specific handler; only the issuing provider understands it.
    Custom {
        /// Handler name.
        name: String,
        /// Handler data.
        data: serde_json::Value,
    },
}

impl ResolutionRequest {
    /// Applies the request with the standard handlers.
    ///
    /// # Errors
    ///
    /// Returns an invariant error if the referenced event is no longer open,
    /// has the wrong kind, or the request is [`ResolutionRequest::Custom`].
    #[instrument(skip(self, game), fields(game_id = %game.id()))]
    pub fn apply(&self, owner: PlayerId, game: &mut Game) -> Result<(), EngineError> {
        debug!(request = ?self, owner = %owner, "Applying resolution request");
        match self {
            ResolutionRequest::AdjustProduction {
                event,
                forces,
                credits,
            } => match open_event(game, *event)? {
                EventKind::BeginProduction(production) => {
                    production.output.forces += forces;
                    production.output.credits += credits;
                    Ok(())
                }
                other => Err(wrong_kind(*event, "begin_production", other)),
            },
            ResolutionRequest::ConvertForces {
                event,
                forces,
                credits,
            } => match open_event(game, *event)? {
                EventKind::BeginProduction(production) => {
                    if production.output.forces < *forces as i32 {
                        return Err(EngineError::invariant(format!(
                            "Cannot convert {} forces, only {} pending on {}",
                            forces, production.output.forces, event
                        )));
                    }
                    production.output.forces -= *forces as i32;
                    production.output.credits += *credits as i32;
                    Ok(())
                }
                other => Err(wrong_kind(*event, "begin_production", other)),
            },
            ResolutionRequest::AddStrength {
                event,
                side,
                amount,
                source,
            } => match open_event(game, *event)? {
                EventKind::Movement(movement) => {
                    let bonus = StrengthBonus {
                        source: source.clone(),
                        amount: *amount,
                    };
                    match side {
                        CombatSide::Attacker => movement.attacker_bonuses.push(bonus),
                        CombatSide::Defender => movement.defender_bonuses.push(bonus),
                    }
                    Ok(())
                }
                other => Err(wrong_kind(*event, "movement", other)),
            },
            ResolutionRequest::RedirectExcess { event, to } => match open_event(game, *event)? {
                EventKind::Movement(movement) => {
                    movement.excess_redirect = Some(to.clone());
                    Ok(())
                }
                other => Err(wrong_kind(*event, "movement", other)),
            },
            ResolutionRequest::GainCredits { player, amount } => {
                game.player_mut(*player)?.credits += amount;
                Ok(())
            }
            ResolutionRequest::Custom { name, .. } => Err(EngineError::invariant(format!(
                "No standard handler for custom request '{}'",
                name
            ))),
        }
    }
}

fn open_event(game: &mut Game, id: EventId) -> Result<&mut EventKind, EngineError> {
    game.stack_mut()
        .find_mut(id)
        .map(|e| e.kind_mut())
        .ok_or_else(|| EngineError::invariant(format!("Event {} is no longer open", id)))
}

fn wrong_kind(id: EventId, expected: &str, found: &EventKind) -> EngineError {
    EngineError::invariant(format!(
        "Event {} is {}, expected {}",
        id,
        found.tag(),
        expected
    ))
}
