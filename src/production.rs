//! Production: seeding a begin-production event and applying its output.

use tracing::{info, instrument};

use crate::EngineError;
use crate::event::{ProductionEvent, ProductionOutput, ProductionReport};
use crate::game::{Game, PlanetId, PlayerId};

/// Planets `player` may still produce on this turn, in name order.
pub fn production_candidates(game: &Game, player: PlayerId) -> Vec<PlanetId> {
    game.board()
        .owned_by(player)
        .filter(|p| !*p.exhausted())
        .map(|p| p.name().clone())
        .collect()
}

/// Builds the accumulator for producing on `planet`.
///
/// # Errors
///
/// Returns an input error if the planet is not the player's or is exhausted.
#[instrument(skip(game), fields(game_id = %game.id()))]
pub fn begin_production(
    game: &Game,
    player: PlayerId,
    planet: &str,
) -> Result<ProductionEvent, EngineError> {
    let target = game.board().planet(planet)?;
    if !target.is_owned_by(player) {
        return Err(EngineError::input(format!("You do not control {}", planet)));
    }
    if *target.exhausted() {
        return Err(EngineError::input(format!(
            "{} is exhausted this turn",
            planet
        )));
    }
    Ok(ProductionEvent {
        player,
        planet: target.name().clone(),
        output: ProductionOutput {
            forces: *target.base_output() as i32,
            credits: 0,
        },
    })
}

/// Applies a resolved production.
///
/// Negative output clamps to zero; forces above capacity are destroyed.
///
/// # Errors
///
/// Returns an invariant error if the planet or player is gone.
#[instrument(skip(game, production), fields(game_id = %game.id(), planet = %production.planet))]
pub(crate) fn finish_production(
    game: &mut Game,
    production: &ProductionEvent,
) -> Result<ProductionReport, EngineError> {
    let capacity = *game.capacity();
    let forces = production.output.forces.max(0) as u32;
    let credits = production.output.credits.max(0) as u32;

    let planet = game.board_mut().planet_mut(&production.planet)?;
    let room = capacity.saturating_sub(planet.forces);
    let produced = forces.min(room);
    planet.forces += produced;
    planet.exhausted = true;

    game.player_mut(production.player)?.credits += credits;

    let report = ProductionReport {
        player: production.player,
        planet: production.planet.clone(),
        produced,
        destroyed: forces - produced,
        credits,
    };
    info!(
        produced,
        destroyed = report.destroyed,
        credits,
        "Production resolved"
    );
    Ok(report)
}
