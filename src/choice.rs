//! Menus for decision events and the handlers that consume a click.
//!
//! A decision event may need several clicks. Each click either completes the
//! decision or leaves it on the stack with updated state; any events the
//! click produced are pushed above it and drain before the menu is rebuilt.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::EngineError;
use crate::event::{EventKind, ProductionChoiceEvent};
use crate::game::{Game, PlanetId, PlayerId};
use crate::movement::{MovementChoice, PlanStep};
use crate::production::{begin_production, production_candidates};

/// A click on a decision event's menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    /// Produce on a planet.
    Produce {
        /// Chosen planet.
        planet: PlanetId,
    },
    /// Stop producing this turn.
    FinishProduction,
    /// Advance the movement wizard.
    Movement(MovementChoice),
}

/// One button of a menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuOption {
    /// Button label.
    pub label: String,
    /// What clicking it does.
    pub choice: Choice,
}

/// The menu of a decision event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    /// Prompt text.
    pub text: String,
    /// The only player allowed to click.
    pub chooser: PlayerId,
    /// Buttons in display order.
    pub options: Vec<MenuOption>,
}

/// Result of handling one click.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChoiceOutcome {
    /// True when the decision is resolved and should leave the stack.
    pub complete: bool,
    /// Events to push above the decision, in push order.
    pub follow_ups: Vec<EventKind>,
    /// Replacement decision state when the decision stays open.
    pub updated: Option<EventKind>,
    /// What happened, for the journal.
    pub journal: Vec<String>,
}

fn remaining_candidates(game: &Game, choice: &ProductionChoiceEvent) -> Vec<PlanetId> {
    production_candidates(game, choice.player)
        .into_iter()
        .filter(|p| !choice.produced.contains(p))
        .collect()
}

/// Builds the menu for a decision event.
///
/// # Errors
///
/// Returns an invariant error if `event` is not a decision event.
#[instrument(skip(event, game), fields(game_id = %game.id(), tag = %event.tag()))]
pub fn show_choices(event: &EventKind, game: &Game) -> Result<Menu, EngineError> {
    match event {
        EventKind::ProductionChoice(choice) => {
            let mut options = Vec::new();
            for planet in remaining_candidates(game, choice) {
                let output = game.board().planet(&planet)?.base_output();
                options.push(MenuOption {
                    label: format!("Produce on {} (output {})", planet, output),
                    choice: Choice::Produce { planet },
                });
            }
            options.push(MenuOption {
                label: "Done producing".to_string(),
                choice: Choice::FinishProduction,
            });
            Ok(Menu {
                text: format!("{}, where do you want to produce?", game.name_of(choice.player)),
                chooser: choice.player,
                options,
            })
        }
        EventKind::MovementPlanning(plan) => Ok(Menu {
            text: plan.prompt_text(game),
            chooser: *plan.player(),
            options: plan
                .options(game)?
                .into_iter()
                .map(|(label, choice)| MenuOption {
                    label,
                    choice: Choice::Movement(choice),
                })
                .collect(),
        }),
        other => Err(EngineError::invariant(format!(
            "{} is not a decision event",
            other.tag()
        ))),
    }
}

/// Applies one click to a decision event.
///
/// `event` is a copy of the open decision; the caller writes back
/// [`ChoiceOutcome::updated`] or pops the decision when complete.
///
/// # Errors
///
/// Returns an input error if the choice does not fit the decision or is no
/// longer legal.
#[instrument(skip(event, game), fields(game_id = %game.id(), tag = %event.tag()))]
pub fn handle_choice(
    event: &EventKind,
    choice: &Choice,
    game: &mut Game,
) -> Result<ChoiceOutcome, EngineError> {
    match (event, choice) {
        (EventKind::ProductionChoice(state), Choice::Produce { planet }) => {
            let remaining = remaining_candidates(game, state);
            if !remaining.contains(planet) {
                return Err(EngineError::input(format!(
                    "You cannot produce on {} right now",
                    planet
                )));
            }
            let production = begin_production(game, state.player, planet)?;
            let mut next = state.clone();
            next.produced.push(planet.clone());
            let complete = remaining.len() == 1;
            debug!(planet = %planet, complete, "Production chosen");
            Ok(ChoiceOutcome {
                complete,
                follow_ups: vec![EventKind::BeginProduction(production)],
                updated: (!complete).then(|| EventKind::ProductionChoice(next)),
                journal: vec![format!(
                    "{} produces on {}",
                    game.name_of(state.player),
                    planet
                )],
            })
        }
        (EventKind::ProductionChoice(state), Choice::FinishProduction) => Ok(ChoiceOutcome {
            complete: true,
            journal: vec![format!("{} is done producing", game.name_of(state.player))],
            ..ChoiceOutcome::default()
        }),
        (EventKind::MovementPlanning(plan), Choice::Movement(movement_choice)) => {
            let mut plan = plan.clone();
            match plan.apply(game, movement_choice)? {
                PlanStep::Continue => Ok(ChoiceOutcome {
                    updated: Some(EventKind::MovementPlanning(plan)),
                    ..ChoiceOutcome::default()
                }),
                PlanStep::Cancelled => Ok(ChoiceOutcome {
                    complete: true,
                    journal: vec![format!(
                        "{} cancelled the move",
                        game.name_of(*plan.player())
                    )],
                    ..ChoiceOutcome::default()
                }),
                PlanStep::Confirmed(movement) => {
                    plan.apply_bookkeeping(game, &movement)?;
                    Ok(ChoiceOutcome {
                        complete: true,
                        follow_ups: vec![EventKind::Movement(movement)],
                        updated: None,
                        journal: Vec::new(),
                    })
                }
            }
        }
        (event, _) => Err(EngineError::input(format!(
            "That option does not apply to {}",
            event.tag()
        ))),
    }
}
