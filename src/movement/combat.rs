//! Merge and combat arithmetic for a resolved movement.

use derive_new::new;
use tracing::{info, instrument, warn};

use crate::EngineError;
use crate::event::{CaptureEvent, CombatSide, MovementEvent, MovementReport};
use crate::game::Game;

/// Inputs of one arrival at a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct Engagement {
    /// Forces arriving.
    pub moving: u32,
    /// Forces present at the destination.
    pub defending: u32,
    /// Attacker strength bonus.
    pub attacker_bonus: u32,
    /// Defender strength bonus.
    pub defender_bonus: u32,
    /// Planet capacity.
    pub capacity: u32,
    /// True when the destination belongs to another player.
    pub hostile: bool,
}

/// Outcome of an [`Engagement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementOutcome {
    /// Arriving forces that survived.
    pub mover_remaining: u32,
    /// Defending forces that survived.
    pub defender_remaining: u32,
    /// Forces on the destination afterwards, capped.
    pub resulting_forces: u32,
    /// Forces above capacity, destroyed unless redirected.
    pub excess: u32,
    /// True when the mover controls the destination afterwards.
    pub mover_holds: bool,
}

/// Resolves one arrival.
///
/// A friendly or unowned destination merges (`defending + moving`). A hostile
/// one fights: each side's strength is its forces plus bonuses; the winner
/// keeps the difference, never more than it brought. Without bonuses both
/// sides lose `min(moving, defending)`. The result is capped at `capacity`.
pub fn resolve_engagement(engagement: Engagement) -> EngagementOutcome {
    let Engagement {
        moving,
        defending,
        attacker_bonus,
        defender_bonus,
        capacity,
        hostile,
    } = engagement;

    if !hostile {
        let total = defending + moving;
        let resulting = total.min(capacity);
        return EngagementOutcome {
            mover_remaining: moving,
            defender_remaining: defending,
            resulting_forces: resulting,
            excess: total - resulting,
            mover_holds: resulting > 0,
        };
    }

    let attack = moving + attacker_bonus;
    let defence = defending + defender_bonus;
    let mover_remaining = attack.saturating_sub(defence).min(moving);
    let defender_remaining = defence.saturating_sub(attack).min(defending);
    let survivors = mover_remaining.max(defender_remaining);
    let resulting = survivors.min(capacity);
    EngagementOutcome {
        mover_remaining,
        defender_remaining,
        resulting_forces: resulting,
        excess: survivors - resulting,
        mover_holds: mover_remaining > 0,
    }
}

/// Predicts the outcome of a pending movement without changing state.
///
/// # Errors
///
/// Returns an invariant error if the destination does not exist.
pub fn project(game: &Game, movement: &MovementEvent) -> Result<EngagementOutcome, EngineError> {
    let destination = game.board().planet(&movement.destination)?;
    let hostile = destination
        .owner()
        .is_some_and(|owner| owner != movement.mover);
    Ok(resolve_engagement(Engagement::new(
        movement.total_moving(),
        *destination.forces(),
        movement.bonus(CombatSide::Attacker),
        movement.bonus(CombatSide::Defender),
        *game.capacity(),
        hostile,
    )))
}

/// Applies a movement to the board.
///
/// Returns the report and, when an enemy planet changed hands, the capture.
///
/// # Errors
///
/// Returns an invariant error when a source is not the mover's, holds fewer
/// forces than requested, repeats, or is the destination.
#[instrument(skip(game, movement), fields(game_id = %game.id(), mover = %movement.mover, destination = %movement.destination))]
pub(crate) fn execute_movement(
    game: &mut Game,
    movement: &MovementEvent,
) -> Result<(MovementReport, Option<CaptureEvent>), EngineError> {
    let moved = movement.total_moving();
    if moved == 0 {
        return Err(EngineError::invariant("Movement carries no forces"));
    }
    for (index, source) in movement.sources.iter().enumerate() {
        if source.planet == movement.destination {
            return Err(EngineError::invariant(format!(
                "Source '{}' is also the destination",
                source.planet
            )));
        }
        if movement.sources[..index]
            .iter()
            .any(|s| s.planet == source.planet)
        {
            return Err(EngineError::invariant(format!(
                "Source '{}' listed twice",
                source.planet
            )));
        }
        let planet = game.board().planet(&source.planet)?;
        if !planet.is_owned_by(movement.mover) {
            return Err(EngineError::invariant(format!(
                "Player {} does not own source '{}'",
                movement.mover, source.planet
            )));
        }
        if source.amount > *planet.forces() {
            return Err(EngineError::invariant(format!(
                "Insufficient forces on '{}': {} requested, {} present",
                source.planet,
                source.amount,
                planet.forces()
            )));
        }
    }

    let outcome = project(game, movement)?;
    let capacity = *game.capacity();
    let board = game.board_mut();
    for source in &movement.sources {
        board.planet_mut(&source.planet)?.forces -= source.amount;
    }

    let destination = board.planet_mut(&movement.destination)?;
    let previous_owner = destination.owner;
    let hostile = previous_owner.is_some_and(|owner| owner != movement.mover);
    destination.forces = outcome.resulting_forces;
    destination.owner = if outcome.mover_holds {
        Some(movement.mover)
    } else if outcome.resulting_forces > 0 {
        previous_owner
    } else {
        None
    };

    let mut destroyed_excess = outcome.excess;
    if outcome.excess > 0 {
        if let (Some(target), true) = (&movement.excess_redirect, outcome.mover_holds) {
            match board.planet_mut(target) {
                Ok(planet) if planet.is_owned_by(movement.mover) && *target != movement.destination => {
                    let room = capacity.saturating_sub(planet.forces);
                    let received = room.min(outcome.excess);
                    planet.forces += received;
                    destroyed_excess = outcome.excess - received;
                    info!(target = %target, received, "Excess forces redirected");
                }
                _ => warn!(target = %target, "Redirect target no longer valid, excess destroyed"),
            }
        }
    }

    let capture = match previous_owner {
        Some(previous) if hostile && outcome.mover_holds => Some(CaptureEvent {
            mover: movement.mover,
            previous_owner: previous,
            planet: movement.destination.clone(),
        }),
        _ => None,
    };

    let report = MovementReport {
        mover: movement.mover,
        ability: movement.ability.clone(),
        destination: movement.destination.clone(),
        moved,
        resulting_forces: outcome.resulting_forces,
        resulting_owner: game.board().planet(&movement.destination)?.owner,
        destroyed_excess,
        fought: hostile,
    };
    info!(
        moved,
        resulting = report.resulting_forces,
        destroyed_excess,
        captured = capture.is_some(),
        "Movement resolved"
    );
    Ok((report, capture))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_caps_at_capacity() {
        let outcome = resolve_engagement(Engagement::new(4, 5, 0, 0, 6, false));
        assert_eq!(outcome.resulting_forces, 6);
        assert_eq!(outcome.excess, 3);
        assert!(outcome.mover_holds);
    }

    #[test]
    fn test_defender_bonus_can_hold_planet() {
        let outcome = resolve_engagement(Engagement::new(3, 2, 0, 2, 6, true));
        assert_eq!(outcome.mover_remaining, 0);
        assert_eq!(outcome.defender_remaining, 1);
        assert!(!outcome.mover_holds);
    }

    #[test]
    fn test_attacker_bonus_never_adds_forces() {
        let outcome = resolve_engagement(Engagement::new(2, 0, 3, 0, 6, true));
        assert_eq!(outcome.mover_remaining, 2);
        assert_eq!(outcome.resulting_forces, 2);
    }

    #[test]
    fn test_mutual_destruction_leaves_nothing() {
        let outcome = resolve_engagement(Engagement::new(3, 3, 0, 0, 6, true));
        assert_eq!(outcome.resulting_forces, 0);
        assert!(!outcome.mover_holds);
    }
}
